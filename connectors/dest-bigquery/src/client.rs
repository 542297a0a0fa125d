//! REST client for BigQuery load jobs.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use tablehop_engine::{JobHandle, JobOutcome, LoadJob, Warehouse};
use tablehop_types::error::{Result, TransferError};

use crate::config::Config;
use crate::job::{self, Job, JobInsert, JobReference};
use crate::ndjson;
use crate::schema::table_schema;
use crate::table::TableRef;

/// Load-job client bound to one project and access token.
///
/// Each chunk is uploaded with a multipart `jobs.insert` and then polled
/// with `jobs.get` until the service reports `DONE`.
pub struct BigQueryClient {
    http: Client,
    base_url: Url,
    access_token: String,
    default_project: Option<String>,
    location: Option<String>,
    poll_interval: Duration,
    /// Owning project of each submitted job, for `jobs.get`.
    job_projects: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    status: Option<String>,
    message: String,
}

impl BigQueryClient {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            TransferError::config("INVALID_CONFIG", format!("bigquery base_url: {e}"))
        })?;
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                TransferError::connection("CLIENT_INIT_FAILED", format!("http client: {e}"))
            })?;
        Ok(Self {
            http,
            base_url,
            access_token: config.access_token.clone(),
            default_project: config.project_id.clone(),
            location: config.location.clone(),
            poll_interval: config.poll_interval(),
            job_projects: HashMap::new(),
        })
    }

    /// Resolve a configured table id against this client's default project.
    pub fn table_ref(&self, id: &str) -> Result<TableRef> {
        TableRef::parse(id, self.default_project.as_deref())
    }

    fn job_project(&self, table: &TableRef) -> String {
        self.default_project
            .clone()
            .unwrap_or_else(|| table.project.clone())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TransferError::config(
                    "INVALID_CONFIG",
                    format!("bigquery base_url '{}' cannot take a path", self.base_url),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Confirm the dataset exists and report whether the table does.
    ///
    /// A missing table is fine: the first load job creates it.
    pub async fn check(&self, table: &str) -> Result<bool> {
        let table = self.table_ref(table)?;
        let dataset_url = self.endpoint(&[
            "bigquery",
            "v2",
            "projects",
            &table.project,
            "datasets",
            &table.dataset,
        ])?;
        let response = self.send(self.http.get(dataset_url.clone()), "GET", &dataset_url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(TransferError::config(
                "DATASET_NOT_FOUND",
                format!("dataset {}.{} does not exist", table.project, table.dataset),
            ));
        }
        if !response.status().is_success() {
            return Err(api_error(response, "dataset lookup").await);
        }

        let table_url = self.endpoint(&[
            "bigquery",
            "v2",
            "projects",
            &table.project,
            "datasets",
            &table.dataset,
            "tables",
            &table.table,
        ])?;
        let response = self.send(self.http.get(table_url.clone()), "GET", &table_url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => Err(api_error(response, "table lookup").await),
        }
    }

    async fn get_job(&self, project: &str, handle: &JobHandle) -> Result<Job> {
        let mut url =
            self.endpoint(&["bigquery", "v2", "projects", project, "jobs", &handle.job_id])?;
        if let Some(location) = handle.location.as_deref().or(self.location.as_deref()) {
            url.query_pairs_mut().append_pair("location", location);
        }
        let response = self.send(self.http.get(url.clone()), "GET", &url).await?;
        if !response.status().is_success() {
            return Err(api_error(response, "job status").await);
        }
        response.json::<Job>().await.map_err(|e| {
            TransferError::load_job(
                "INVALID_RESPONSE",
                format!("job {} status: {e}", handle.job_id),
            )
        })
    }

    /// Forget a submitted job, returning the project it was billed to.
    fn take_job_project(&mut self, job_id: &str) -> Result<String> {
        self.job_projects.remove(job_id).ok_or_else(|| {
            TransferError::internal(
                "UNKNOWN_JOB",
                format!("job {job_id} was not submitted by this client"),
            )
        })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        url: &Url,
    ) -> Result<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                let code = if e.is_timeout() {
                    "REQUEST_TIMEOUT"
                } else {
                    "REQUEST_FAILED"
                };
                TransferError::connection(code, format!("{method} {}: {e}", url.path()))
            })?;
        tracing::debug!(
            method,
            path = url.path(),
            status = response.status().as_u16(),
            "BigQuery request"
        );
        Ok(response)
    }
}

impl Warehouse for BigQueryClient {
    async fn submit(&mut self, job: LoadJob<'_>) -> Result<JobHandle> {
        let table = self.table_ref(job.table)?;
        let project = self.job_project(&table);
        let job_id = job::job_id(&table, job.chunk_index, chrono::Utc::now().timestamp_millis());

        let insert = JobInsert::load(
            JobReference {
                project_id: project.clone(),
                job_id: job_id.clone(),
                location: self.location.clone(),
            },
            &table,
            job.write_disposition,
            table_schema(&job.rows.schema())?,
        );
        let metadata = serde_json::to_vec(&insert).map_err(|e| {
            TransferError::internal("ENCODE_FAILED", format!("job metadata: {e}"))
        })?;
        let data = ndjson::encode(job.rows)?;
        let boundary = format!("tablehop_boundary_{job_id}");
        let body = multipart_related(&boundary, &metadata, &data);

        let mut url = self.endpoint(&["upload", "bigquery", "v2", "projects", &project, "jobs"])?;
        url.query_pairs_mut().append_pair("uploadType", "multipart");
        tracing::debug!(
            job_id = %job_id,
            chunk = job.chunk_index,
            rows = job.rows.num_rows(),
            bytes = data.len(),
            disposition = %job.write_disposition,
            "Uploading load job"
        );
        let request = self
            .http
            .post(url.clone())
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        let response = self.send(request, "POST", &url).await?;
        if !response.status().is_success() {
            return Err(api_error(response, "load job submit").await);
        }
        let created = response.json::<Job>().await.map_err(|e| {
            TransferError::load_job("INVALID_RESPONSE", format!("job {job_id} insert: {e}"))
        })?;

        let handle = JobHandle {
            job_id: created.job_reference.job_id,
            location: created.job_reference.location.or_else(|| self.location.clone()),
        };
        self.job_projects.insert(handle.job_id.clone(), project);
        Ok(handle)
    }

    async fn wait(&mut self, handle: &JobHandle) -> Result<JobOutcome> {
        let project = self.take_job_project(&handle.job_id)?;
        loop {
            let job = self.get_job(&project, handle).await?;
            if job.is_done() {
                return job.outcome();
            }
            tracing::debug!(job_id = %handle.job_id, state = %job.status.state, "Load job pending");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// `multipart/related` body: JSON metadata part, then the data part.
pub fn multipart_related(boundary: &str, metadata: &[u8], data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

async fn api_error(response: Response, what: &str) -> TransferError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("Unable to read error body"));
    let detail = parse_api_error(&body).unwrap_or(body);
    let message = format!("{what} failed ({}): {detail}", status.as_u16());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TransferError::connection("AUTH_FAILED", message)
        }
        StatusCode::CONFLICT => TransferError::load_job("DUPLICATE_JOB", message),
        _ => TransferError::load_job("REQUEST_REJECTED", message),
    }
}

fn parse_api_error(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    Some(match envelope.error.status {
        Some(status) => format!("{status}: {}", envelope.error.message),
        None => envelope.error.message,
    })
}

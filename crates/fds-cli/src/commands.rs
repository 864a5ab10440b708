//! Subcommands

use anyhow::{bail, Context};
use bytes::Bytes;
use chrono::Utc;
use clap::{Args, Subcommand};
use fds_client::{
    interceptor::http_date, put_file, signer, FdsClient, ListObjectsOptions, ProgressCallback,
};
use http::{header::DATE, HeaderMap, HeaderName, HeaderValue, Method};
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List buckets
    Buckets {
        /// Only buckets the caller was granted access to
        #[arg(long)]
        authorized: bool,
    },

    /// Make a bucket
    Mb {
        bucket: String,
        /// Canned ACL to apply, may be repeated
        #[arg(long)]
        acl: Vec<String>,
    },

    /// Remove a bucket
    Rb { bucket: String },

    /// List objects in a bucket
    Ls {
        bucket: String,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        delimiter: Option<String>,
        #[arg(long)]
        max_keys: Option<u32>,
    },

    /// Upload a file
    Put {
        bucket: String,
        key: String,
        file: PathBuf,
    },

    /// Download an object
    Get {
        bucket: String,
        key: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Byte range, e.g. bytes=0-99
        #[arg(long)]
        range: Option<String>,
    },

    /// Remove an object
    Rm { bucket: String, key: String },

    /// Print the canonical string the signature is computed over
    StringToSign(StringToSignArgs),
}

#[derive(Args, Debug)]
pub struct StringToSignArgs {
    /// Request URL, absolute or starting with '/'
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request header as "Name: value", may be repeated
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Date header value; defaults to now
    #[arg(long)]
    pub date: Option<String>,
}

impl StringToSignArgs {
    pub fn render(&self) -> anyhow::Result<String> {
        let url = if self.url.starts_with('/') {
            Url::parse("http://localhost")?.join(&self.url)?
        } else {
            Url::parse(&self.url).with_context(|| format!("invalid URL: {}", self.url))?
        };
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("invalid method: {}", self.method))?;

        let mut headers = HeaderMap::new();
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            headers.append(name, value);
        }
        let date = self.date.clone().unwrap_or_else(|| http_date(Utc::now()));
        headers.insert(DATE, HeaderValue::from_str(&date)?);

        Ok(signer::string_to_sign(&url, &method, &headers)?)
    }
}

/// Parse a curl-style `Name: value` header
pub fn parse_header(raw: &str) -> anyhow::Result<(HeaderName, HeaderValue)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header must look like 'Name: value', got '{}'", raw);
    };
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("invalid header name in '{}'", raw))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("invalid header value in '{}'", raw))?;
    Ok((name, value))
}

/// Write downloaded data to `output`, or stdout when absent
pub async fn write_output(output: Option<&Path>, data: &Bytes) -> anyhow::Result<()> {
    match output {
        Some(path) => tokio::fs::write(path, data)
            .await
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn progress_printer() -> ProgressCallback {
    Box::new(|p| {
        eprintln!(
            "part {}/{} done ({:.1}%)",
            p.parts_done,
            p.total_parts,
            p.percentage()
        );
    })
}

pub async fn run(client: &FdsClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Buckets { authorized } => {
            let result = client.list_buckets(authorized).await?;
            for bucket in result.buckets {
                println!("{}", bucket.name);
            }
        }
        Command::Mb { bucket, acl } => {
            let acl: Vec<&str> = acl.iter().map(String::as_str).collect();
            client.put_bucket(&bucket, &acl).await?;
            tracing::info!("Created bucket {}", bucket);
        }
        Command::Rb { bucket } => {
            client.delete_bucket(&bucket).await?;
            tracing::info!("Deleted bucket {}", bucket);
        }
        Command::Ls {
            bucket,
            prefix,
            delimiter,
            max_keys,
        } => {
            let options = ListObjectsOptions {
                prefix,
                delimiter,
                max_keys,
                marker: None,
            };
            let result = client.list_objects(&bucket, Some(options)).await?;
            for prefix in &result.common_prefixes {
                println!("{:>12}  {}", "DIR", prefix);
            }
            for object in &result.objects {
                println!("{:>12}  {}", object.size, object.name);
            }
            if result.truncated {
                eprintln!("(truncated, next marker: {})", result.next_marker.unwrap_or_default());
            }
        }
        Command::Put { bucket, key, file } => {
            if !file.is_file() {
                bail!("not a file: {}", file.display());
            }
            let result = put_file(client, &bucket, &key, &file, Some(progress_printer())).await?;
            println!("{}/{}", result.bucket_name, result.object_name);
        }
        Command::Get {
            bucket,
            key,
            output,
            range,
        } => {
            let object = client.get_object(&bucket, &key, range.as_deref()).await?;
            write_output(output.as_deref(), &object.data).await?;
        }
        Command::Rm { bucket, key } => {
            client.delete_object(&bucket, &key).await?;
            tracing::info!("Deleted {}/{}", bucket, key);
        }
        Command::StringToSign(args) => {
            println!("{}", args.render()?);
        }
    }
    Ok(())
}

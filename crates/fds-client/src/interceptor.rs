//! Authenticating request interceptor

use crate::{
    signer::Signer,
    transport::{HttpRequest, HttpResponse, Transport},
    ClientError, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{HeaderValue, AUTHORIZATION, DATE};

/// Authorization scheme understood by the service
pub const AUTH_SCHEME: &str = "Galaxy-V2";

/// Format a timestamp the way the `Date` header expects (RFC 1123, GMT)
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Stamps `Date` and `Authorization` onto outgoing requests.
#[derive(Clone, Debug)]
pub struct SigningInterceptor {
    signer: Signer,
}

impl SigningInterceptor {
    /// Create an interceptor around a signer
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// The signer used by this interceptor
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Sign `request` using the current time
    pub fn intercept(&self, request: &mut HttpRequest) -> Result<()> {
        self.intercept_at(request, Utc::now())
    }

    /// Sign `request` as if it were sent at `now`.
    ///
    /// Any `Date` or `Authorization` already present is replaced. The same
    /// date string is both signed and sent.
    pub fn intercept_at(&self, request: &mut HttpRequest, now: DateTime<Utc>) -> Result<()> {
        request.headers.remove(AUTHORIZATION);
        request.headers.insert(DATE, header_value(http_date(now))?);

        let signature = self
            .signer
            .sign(&request.url, &request.method, &request.headers)?;
        let authorization = format!(
            "{} {}:{}",
            AUTH_SCHEME,
            self.signer.access_key_id(),
            signature
        );
        request.headers.insert(AUTHORIZATION, header_value(authorization)?);
        Ok(())
    }
}

fn header_value(value: String) -> Result<HeaderValue> {
    HeaderValue::try_from(value)
        .map_err(|e| ClientError::InvalidArgument(format!("invalid header value: {}", e)))
}

/// [`Transport`] layer that signs every request before handing it on.
#[derive(Clone, Debug)]
pub struct SigningTransport<T> {
    interceptor: SigningInterceptor,
    inner: T,
}

impl<T: Transport> SigningTransport<T> {
    /// Sign requests with `interceptor` and send them through `inner`
    pub fn new(interceptor: SigningInterceptor, inner: T) -> Self {
        Self { interceptor, inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for SigningTransport<T> {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        self.interceptor.intercept(&mut request)?;
        self.inner.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{signer::string_to_sign, Credential};
    use crate::transport::{ReqwestTransport, RetryTransport};
    use chrono::TimeZone;
    use http::{HeaderName, Method};
    use std::sync::{Arc, Mutex};
    use url::Url;

    fn interceptor() -> SigningInterceptor {
        SigningInterceptor::new(Signer::new(Credential::new("AKID", "test-secret").unwrap()))
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 12, 30, 0, 4, 8).unwrap()
    }

    #[test]
    fn test_http_date_format() {
        assert_eq!(http_date(fixed_time()), "Sat, 30 Dec 2017 00:04:08 GMT");
    }

    #[test]
    fn test_intercept_sets_date_and_authorization() {
        let mut request = HttpRequest::new(
            Method::PUT,
            Url::parse("https://fds.example.com/bucket/key?uploads").unwrap(),
        );
        interceptor().intercept_at(&mut request, fixed_time()).unwrap();

        assert_eq!(request.headers[DATE], "Sat, 30 Dec 2017 00:04:08 GMT");
        assert_eq!(
            request.headers[AUTHORIZATION],
            "Galaxy-V2 AKID:9zT4Ne1+P7LF1wxIsyHU/WOv7G0="
        );
    }

    #[test]
    fn test_intercept_replaces_existing_values() {
        let mut request = HttpRequest::new(
            Method::GET,
            Url::parse("https://fds.example.com/bucket").unwrap(),
        );
        request
            .headers
            .insert(DATE, HeaderValue::from_static("Mon, 01 Jan 2001 00:00:00 GMT"));
        request
            .headers
            .append(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        request
            .headers
            .append(AUTHORIZATION, HeaderValue::from_static("Bearer staler"));

        interceptor().intercept_at(&mut request, fixed_time()).unwrap();

        assert_eq!(request.headers.get_all(DATE).iter().count(), 1);
        assert_eq!(request.headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(request.headers[DATE], "Sat, 30 Dec 2017 00:04:08 GMT");
        assert!(request.headers[AUTHORIZATION]
            .to_str()
            .unwrap()
            .starts_with("Galaxy-V2 AKID:"));
    }

    #[test]
    fn test_signature_covers_sent_headers() {
        let interceptor = interceptor();
        let mut request = HttpRequest::new(
            Method::PUT,
            Url::parse("https://fds.example.com/bucket/obj?acl&foo=bar").unwrap(),
        )
        .with_body("payload");
        request.headers.insert(
            HeaderName::from_static("x-xiaomi-meta-acl"),
            HeaderValue::from_static("PUBLIC_READ"),
        );

        interceptor.intercept(&mut request).unwrap();

        // recompute from exactly what is on the wire
        let canonical = string_to_sign(&request.url, &request.method, &request.headers).unwrap();
        let expected = format!(
            "Galaxy-V2 AKID:{}",
            interceptor.signer().sign_string(&canonical).unwrap()
        );
        assert_eq!(request.headers[AUTHORIZATION], expected.as_str());
        assert_eq!(request.body, "payload");
        assert_eq!(request.url.query(), Some("acl&foo=bar"));
    }

    /// Records what each attempt carried before handing it to the real transport
    struct Recording {
        inner: ReqwestTransport,
        attempts: Arc<Mutex<Vec<HttpRequest>>>,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.attempts.lock().unwrap().push(request.clone());
            self.inner.send(request).await
        }
    }

    #[tokio::test]
    async fn test_every_retry_is_signed_afresh() {
        let max_retries = 2;
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let stack = RetryTransport::new(
            SigningTransport::new(
                interceptor(),
                Recording {
                    inner: ReqwestTransport::from_client(reqwest::Client::new()),
                    attempts: Arc::clone(&attempts),
                },
            ),
            max_retries,
        );

        // nothing listens on port 1
        let mut request = HttpRequest::new(
            Method::PUT,
            Url::parse("http://127.0.0.1:1/bucket/key?uploadId=u&partNumber=1").unwrap(),
        )
        .with_body("part");
        request
            .headers
            .insert(DATE, HeaderValue::from_static("Mon, 01 Jan 2001 00:00:00 GMT"));
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Galaxy-V2 AKID:stale"));

        let err = stack.send(request).await.unwrap_err();
        assert!(err.is_retryable());

        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), max_retries as usize + 1);
        let interceptor = interceptor();
        let signer = interceptor.signer();
        for attempt in attempts.iter() {
            assert_eq!(attempt.headers.get_all(DATE).iter().count(), 1);
            assert_eq!(attempt.headers.get_all(AUTHORIZATION).iter().count(), 1);
            assert_ne!(attempt.headers[DATE], "Mon, 01 Jan 2001 00:00:00 GMT");

            let expected = format!(
                "Galaxy-V2 AKID:{}",
                signer
                    .sign(&attempt.url, &attempt.method, &attempt.headers)
                    .unwrap()
            );
            assert_eq!(attempt.headers[AUTHORIZATION], expected.as_str());
        }
    }
}

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;

use super::api_types::ApiEnvelope;
use super::error::ApiError;
use super::types::{Book, BookInput, BookPatch, BorrowRequest, BorrowSummaryEntry};

/// The remote library service, one method per REST endpoint.
///
/// No caching here; see `LibraryApi` for that.
#[async_trait]
pub trait LibraryService: Send + Sync {
  /// GET /api/books
  async fn list_books(&self) -> Result<Vec<Book>, ApiError>;

  /// GET /api/books/{id}
  async fn get_book(&self, id: &str) -> Result<Book, ApiError>;

  /// POST /api/books
  async fn create_book(&self, input: &BookInput) -> Result<Book, ApiError>;

  /// PUT /api/books/{id}
  async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, ApiError>;

  /// DELETE /api/books/{id}
  async fn delete_book(&self, id: &str) -> Result<(), ApiError>;

  /// GET /api/borrow
  async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError>;

  /// POST /api/borrow
  async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError>;
}

/// HTTP implementation of the library service
#[derive(Clone)]
pub struct HttpLibraryClient {
  http: reqwest::Client,
  base: Url,
}

impl HttpLibraryClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base = config.base_url()?;
    if base.cannot_be_a_base() {
      return Err(eyre!("Base URL {} can't carry a path", base));
    }

    let mut builder =
      reqwest::Client::builder().user_agent(concat!("bookshelf/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = config.timeout() {
      builder = builder.timeout(timeout);
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  /// Base URL requests are resolved against
  pub fn base_url(&self) -> &Url {
    &self.base
  }

  /// Build `<base>/<segments...>`, escaping each segment.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    // `new` only accepts bases that can carry a path
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
    let url = self.url(segments);
    debug!(method = %method, url = %url, "request");
    self.http.request(method, url)
  }

  /// Send a request and unwrap the `{ data }` envelope.
  ///
  /// Returns `Ok(None)` for an empty body or a null `data`.
  async fn execute<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    resource: &str,
  ) -> Result<Option<T>, ApiError> {
    let response = request.send().await.map_err(|e| {
      warn!(resource, error = %e, "transport error");
      ApiError::from(e)
    })?;

    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
      let err = ApiError::from_response(status.as_u16(), &body, resource);
      warn!(resource, status = status.as_u16(), error = %err, "request failed");
      return Err(err);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
      return Ok(None);
    }

    let envelope: ApiEnvelope<T> = serde_json::from_slice(&body)
      .map_err(|e| ApiError::Decode(format!("{}: {}", resource, e)))?;
    Ok(envelope.data)
  }
}

fn required<T>(data: Option<T>, resource: &str) -> Result<T, ApiError> {
  data.ok_or_else(|| ApiError::Decode(format!("{}: response has no data", resource)))
}

#[async_trait]
impl LibraryService for HttpLibraryClient {
  async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
    let request = self.request(Method::GET, &["api", "books"]);
    let books = self.execute(request, "books").await?;
    Ok(books.unwrap_or_default())
  }

  async fn get_book(&self, id: &str) -> Result<Book, ApiError> {
    let resource = format!("book {}", id);
    let request = self.request(Method::GET, &["api", "books", id]);
    // The service answers an unknown id with `data: null` rather than a 404
    self
      .execute(request, &resource)
      .await?
      .ok_or(ApiError::NotFound(resource))
  }

  async fn create_book(&self, input: &BookInput) -> Result<Book, ApiError> {
    let request = self.request(Method::POST, &["api", "books"]).json(input);
    let book = self.execute(request, "books").await?;
    required(book, "books")
  }

  async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, ApiError> {
    let resource = format!("book {}", id);
    let request = self.request(Method::PUT, &["api", "books", id]).json(patch);
    let book = self.execute(request, &resource).await?;
    required(book, &resource)
  }

  async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
    let resource = format!("book {}", id);
    let request = self.request(Method::DELETE, &["api", "books", id]);
    self
      .execute::<serde_json::Value>(request, &resource)
      .await?;
    Ok(())
  }

  async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
    let request = self.request(Method::GET, &["api", "borrow"]);
    let summary = self.execute(request, "borrow summary").await?;
    Ok(summary.unwrap_or_default())
  }

  async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError> {
    let resource = format!("book {}", request.book);
    let builder = self.request(Method::POST, &["api", "borrow"]).json(request);
    self
      .execute::<serde_json::Value>(builder, &resource)
      .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base_url: &str) -> HttpLibraryClient {
    HttpLibraryClient::new(&ApiConfig {
      base_url: base_url.to_string(),
      timeout_secs: Some(1),
    })
    .unwrap()
  }

  #[test]
  fn test_url_building() {
    let c = client("https://library.example.com");
    assert_eq!(
      c.url(&["api", "books", "42"]).as_str(),
      "https://library.example.com/api/books/42"
    );
  }

  #[test]
  fn test_url_keeps_base_path() {
    let c = client("http://localhost:5000/v2/");
    assert_eq!(
      c.url(&["api", "borrow"]).as_str(),
      "http://localhost:5000/v2/api/borrow"
    );
  }

  #[test]
  fn test_url_escapes_ids() {
    let c = client("http://localhost:5000");
    assert_eq!(
      c.url(&["api", "books", "a/b"]).as_str(),
      "http://localhost:5000/api/books/a%2Fb"
    );
  }

  #[test]
  fn test_rejects_base_without_path() {
    let result = HttpLibraryClient::new(&ApiConfig {
      base_url: "mailto:librarian@example.com".to_string(),
      timeout_secs: None,
    });
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_connection_refused_is_network_error() {
    // A port that was just released has nothing listening on it
    let port = {
      let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
      listener.local_addr().unwrap().port()
    };
    let c = client(&format!("http://127.0.0.1:{}", port));
    let err = c.list_books().await.unwrap_err();
    assert_eq!(err.code(), super::super::error::ErrorCode::Network);
  }
}

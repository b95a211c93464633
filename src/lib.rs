//! # rsgpt
//!
//! Async client for the OpenAI completion API, including the SSE-style
//! streaming variant that delivers incremental text as it is generated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rsgpt::{Client, CompletionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("sk-...")?;
//!
//!     let request = CompletionRequest {
//!         model: "gpt-3.5-turbo-instruct".to_string(),
//!         prompt: Some("Say this is a test".to_string()),
//!         max_tokens: Some(16),
//!         ..CompletionRequest::default()
//!     };
//!
//!     let response = client.create_completion(&request).await?;
//!     println!("{}", response.choices[0].text);
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! # use rsgpt::{Client, CompletionRequest};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::new("sk-...")?;
//! let request = CompletionRequest {
//!     model: "gpt-3.5-turbo-instruct".to_string(),
//!     prompt: Some("Once upon a time".to_string()),
//!     stream: true,
//!     ..CompletionRequest::default()
//! };
//!
//! // The callback observes the cumulative text after every frame.
//! let final_response = client
//!     .create_completion_stream(&request, |partial| {
//!         println!("{}", partial.choices[0].text);
//!     })
//!     .await?;
//! println!("final: {}", final_response.choices[0].text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod completion;
pub mod error;
pub mod files;
pub mod models;
mod stream;

pub use client::Client;
pub use completion::{
    CompletionChoice, CompletionRequest, CompletionResponse, LogprobResult, Usage,
};
pub use error::{ApiError, Error, StreamError};
pub use files::{File, FileList, FileUpload};
pub use models::{Model, ModelList};

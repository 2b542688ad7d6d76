//! SMTP client implementation.
//!
//! # Examples
//!
//! ```no_run
//! use herald_smtp::SmtpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client =
//!     SmtpClient::connect("smtp.example.com:587", "smtp.example.com".to_string()).await?;
//! client.read_greeting().await?;
//! client.ehlo("example.com").await?;
//! client.starttls().await?;
//! client.ehlo("example.com").await?;
//! client.auth_plain("user", "secret").await?;
//! client.mail_from("news@example.com").await?;
//! client.rcpt_to("bob@example.org").await?;
//! client.data().await?;
//! client.send_data("Subject: Hi\r\n\r\nHello Bob").await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod response;
mod smtp_client;

pub use error::{ClientError, Result};
pub use response::{Response, ResponseLine};
pub use smtp_client::SmtpClient;

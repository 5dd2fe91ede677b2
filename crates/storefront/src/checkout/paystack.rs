//! Paystack card checkout.
//!
//! Builds a [`PaymentRequest`] for the cart total and opens a transaction with
//! `POST /transaction/initialize`. The customer finishes payment on the
//! returned authorization URL. Verifying the transaction afterwards is left to
//! the merchant dashboard.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};
use url::Url;

use mauve_core::{CurrencyCode, Email};

use super::CheckoutError;
use crate::cart::CartSnapshot;
use crate::config::PaystackConfig;

const INITIALIZE_PATH: &str = "transaction/initialize";

/// Errors that can occur when talking to Paystack.
#[derive(Debug, Error)]
pub enum PaystackError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// The checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Delivery details attached to the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMetadata {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// A validated `transaction/initialize` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub email: Email,
    /// Minor units (kobo).
    pub amount: i64,
    pub currency: CurrencyCode,
    pub reference: String,
    pub metadata: PaymentMetadata,
}

impl PaymentRequest {
    /// Validate the form and price the cart.
    ///
    /// The reference is the current Unix time in milliseconds.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::EmptyCart` if there is nothing to pay for
    /// - `CheckoutError::MissingField` for a blank form field
    /// - `CheckoutError::InvalidEmail` for a malformed email
    /// - `CheckoutError::InvalidAmount` if the total is zero or not whole kobo
    pub fn new(snapshot: &CartSnapshot, customer: &CustomerDetails) -> Result<Self, CheckoutError> {
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let name = required("name", &customer.name)?;
        let email = required("email", &customer.email)?;
        let phone = required("phone", &customer.phone)?;
        let address = required("address", &customer.address)?;
        let email = Email::parse(email)?;

        let currency = CurrencyCode::NGN;
        let amount = currency
            .to_minor_units(snapshot.total)
            .filter(|kobo| *kobo > 0)
            .ok_or_else(|| CheckoutError::InvalidAmount(currency.format(snapshot.total)))?;

        Ok(Self {
            email,
            amount,
            currency,
            reference: chrono::Utc::now().timestamp_millis().to_string(),
            metadata: PaymentMetadata {
                name: name.to_string(),
                phone: phone.to_string(),
                address: address.to_string(),
            },
        })
    }

    /// Replace the generated reference.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, CheckoutError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckoutError::MissingField(field));
    }
    Ok(value)
}

/// An opened transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentSession {
    /// Where the customer pays.
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

/// Paystack API client.
#[derive(Clone)]
pub struct PaystackClient {
    client: reqwest::Client,
    initialize_url: Url,
}

impl PaystackClient {
    /// Create a new Paystack API client.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value, the base URL
    /// cannot be joined, or the HTTP client fails to build.
    pub fn new(config: &PaystackConfig) -> Result<Self, PaystackError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&config.authorization())
                .map_err(|e| PaystackError::Parse(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let mut base = config.base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let initialize_url = base
            .join(INITIALIZE_PATH)
            .map_err(|e| PaystackError::Parse(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            client,
            initialize_url,
        })
    }

    /// Open a transaction for `request`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Paystack declines it.
    #[instrument(skip(self, request), fields(reference = %request.reference, amount = request.amount))]
    pub async fn initialize(&self, request: &PaymentRequest) -> Result<PaymentSession, PaystackError> {
        let response = self
            .client
            .post(self.initialize_url.clone())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: ApiResponse<PaymentSession> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                error!(status = status.as_u16(), "paystack rejected initialize");
                return Err(PaystackError::Api {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect(),
                });
            }
            Err(e) => return Err(PaystackError::Parse(e.to_string())),
        };

        match parsed.data {
            Some(session) if status.is_success() && parsed.status => {
                info!("payment session opened");
                Ok(session)
            }
            _ => {
                error!(status = status.as_u16(), message = %parsed.message, "paystack rejected initialize");
                Err(PaystackError::Api {
                    status: status.as_u16(),
                    message: parsed.message,
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::json;

    use mauve_core::{CartId, CartItemId, Price, ProductName, Quantity};

    use super::*;
    use crate::cart::{CartItem, total_of};

    fn snapshot(total: Decimal) -> CartSnapshot {
        let cart_id = CartId::generate();
        let items = vec![CartItem {
            id: CartItemId::generate(),
            cart_id,
            name: ProductName::parse("Gel").unwrap(),
            image: None,
            price: Price::new(total),
            qty: Quantity::ONE,
        }];
        CartSnapshot {
            cart_id,
            total: total_of(&items),
            item_count: 1,
            items,
        }
    }

    fn customer() -> CustomerDetails {
        CustomerDetails {
            name: "Ada Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone: "08031234567".to_string(),
            address: "12 Allen Avenue, Ikeja".to_string(),
        }
    }

    #[test]
    fn test_request_in_kobo() {
        let request = PaymentRequest::new(&snapshot(Decimal::from(35_000)), &customer())
            .unwrap()
            .with_reference("1718000000000");

        assert_eq!(request.amount, 3_500_000);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "email": "ada@example.com",
                "amount": 3_500_000,
                "currency": "NGN",
                "reference": "1718000000000",
                "metadata": {
                    "name": "Ada Obi",
                    "phone": "08031234567",
                    "address": "12 Allen Avenue, Ikeja",
                },
            })
        );
    }

    #[test]
    fn test_reference_is_unix_millis() {
        let request = PaymentRequest::new(&snapshot(Decimal::from(100)), &customer()).unwrap();
        let millis: i64 = request.reference.parse().unwrap();
        assert!(millis > 1_600_000_000_000);
    }

    #[test]
    fn test_every_field_required() {
        let snapshot = snapshot(Decimal::from(100));
        for field in ["name", "email", "phone", "address"] {
            let mut form = customer();
            match field {
                "name" => form.name = "  ".to_string(),
                "email" => form.email.clear(),
                "phone" => form.phone.clear(),
                _ => form.address.clear(),
            }
            let err = PaymentRequest::new(&snapshot, &form).unwrap_err();
            assert!(matches!(err, CheckoutError::MissingField(f) if f == field));
        }
    }

    #[test]
    fn test_invalid_email() {
        let mut form = customer();
        form.email = "ada.example.com".to_string();
        let err = PaymentRequest::new(&snapshot(Decimal::from(100)), &form).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidEmail(_)));
    }

    #[test]
    fn test_free_cart_cannot_be_charged() {
        let err = PaymentRequest::new(&snapshot(Decimal::ZERO), &customer()).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAmount(_)));
    }

    #[test]
    fn test_initialize_url_joins_base_path() {
        let client = PaystackClient::new(&PaystackConfig {
            secret_key: SecretString::from("sk_test_4f9a1c7e2b8d0a6f"),
            base_url: Url::parse("http://127.0.0.1:9000/mock").unwrap(),
        })
        .unwrap();
        assert_eq!(
            client.initialize_url.as_str(),
            "http://127.0.0.1:9000/mock/transaction/initialize"
        );
    }
}

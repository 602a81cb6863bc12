use reqwest::Url;
use serde::Serialize;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{CatalogItem, LicenseTier},
};

const MESSAGING_BASE: &str = "https://wa.me";

/// Who receives hand-offs and how prices are shown
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Digits only, international format without `+`
    pub phone: String,
    pub seller_name: String,
    pub currency: String,
}

impl From<&Config> for CheckoutSettings {
    fn from(config: &Config) -> Self {
        Self {
            phone: config.checkout_phone.clone(),
            seller_name: config.seller_name.clone(),
            currency: config.currency.clone(),
        }
    }
}

/// Manual checkout: a prefilled chat link to the seller
#[derive(Debug, Clone, Serialize)]
pub struct Handoff {
    pub tier: LicenseTier,
    pub price: u64,
    pub message: String,
    pub url: String,
}

pub fn handoff_link(
    item: &CatalogItem,
    tier: LicenseTier,
    buyer_email: &str,
    settings: &CheckoutSettings,
) -> AppResult<Handoff> {
    let phone: String = settings.phone.chars().filter(char::is_ascii_digit).collect();
    if phone.is_empty() {
        return Err(AppError::Unavailable(
            "Checkout number is not configured".to_string(),
        ));
    }

    let price = tier.price_for(item.price);
    let message = format!(
        "Hi {}, I'm purchasing \"{}\" ({} License) for {} {} manually. Artist: {}. Send me payment details.",
        settings.seller_name,
        item.title,
        tier,
        settings.currency,
        group_thousands(price),
        buyer_email
    );

    let url = Url::parse_with_params(&format!("{}/{}", MESSAGING_BASE, phone), &[("text", &message)])
        .map_err(|e| AppError::Internal(format!("Invalid checkout link: {}", e)))?;

    tracing::info!(item_id = %item.id, tier = %tier, price, "Checkout hand-off prepared");

    Ok(Handoff {
        tier,
        price,
        message,
        url: url.into(),
    })
}

/// `1234567` -> `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

use serde_json::Value;
use std::io::Read;
use std::process::ExitCode;
use tax_advisor_client::{config::ClientConfig, SubmitTaxRequest, TaxNormalizer};
use tracing::{error, info};

/// Read the raw draft from the given path, or stdin when absent.
async fn load_draft(path: Option<String>) -> tax_advisor_client::Result<Value> {
    let raw = match path {
        Some(path) => {
            info!("Reading draft from {}", path);
            tokio::fs::read_to_string(&path).await?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    Ok(serde_json::from_str(&raw)?)
}

/// Normalize a tax profile draft and print the request body the backend
/// would receive.
#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .init();

    let draft = load_draft(std::env::args().nth(1)).await?;

    match TaxNormalizer::default().normalize_value(&draft) {
        Ok(profile) => {
            info!(
                senior = profile.is_senior_citizen(),
                investments_80c = profile.investments_80c(),
                "Draft normalized"
            );
            let request = SubmitTaxRequest::new(&profile);
            println!("{}", serde_json::to_string_pretty(&request)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(violations) => {
            error!("Draft rejected with {} violation(s)", violations.len());
            for violation in &violations {
                eprintln!("  {}", violation);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tax_advisor_client::error::ClientError;

    #[tokio::test]
    async fn test_missing_draft_file_is_io_error() {
        let err = load_draft(Some("/nonexistent/tax-draft.json".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::IoError(_)));
    }

    #[tokio::test]
    async fn test_malformed_draft_file_is_serialization_error() {
        let path = std::env::temp_dir().join(format!("tax-draft-{}.json", std::process::id()));
        std::fs::write(&path, "{ \"salary\": ").unwrap();

        let err = load_draft(Some(path.display().to_string())).await.unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(err, ClientError::SerializationError(_)));
        assert!(err.is_contract_violation());
    }
}

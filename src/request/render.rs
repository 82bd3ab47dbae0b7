//! Response rendering.

use super::OutputFormat;
use crate::error::ClientError;

/// Reads the full response body and formats it for display.
///
/// # Errors
/// - `Http` if the body cannot be read from the connection
pub async fn render(response: reqwest::Response, format: OutputFormat) -> Result<String, ClientError> {
    let body = response.text().await?;
    Ok(render_body(&body, format))
}

/// Formats a body; JSON that fails to parse falls back to the raw text.
pub fn render_body(body: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Txt => body.to_string(),
        OutputFormat::Json => serde_json::from_str::<serde_json::Value>(body)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .unwrap_or_else(|e| {
                tracing::debug!("Response body is not JSON, showing raw text: {e}");
                body.to_string()
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txt_is_raw() {
        assert_eq!(render_body(r#"{"a":1}"#, OutputFormat::Txt), r#"{"a":1}"#);
    }

    #[test]
    fn test_json_is_pretty_printed() {
        assert_eq!(
            render_body(r#"{"a":1,"b":[true]}"#, OutputFormat::Json),
            "{\n  \"a\": 1,\n  \"b\": [\n    true\n  ]\n}"
        );
    }

    #[test]
    fn test_malformed_json_falls_back_to_raw() {
        let body = "<html>502 Bad Gateway</html>";
        assert_eq!(render_body(body, OutputFormat::Json), body);
    }
}

use super::error::ApiError;
use crate::pipeline::input::{base_name, PdfUpload};
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

/// Parsed multipart form for `POST /api/upload`.
#[derive(Debug)]
pub struct UploadForm {
    pub file: PdfUpload,
    pub title: Option<String>,
}

/// Read the `file` and optional `title` fields; unknown fields are drained.
///
/// Only the file name is validated here. The PDF header is checked by the
/// pipeline so uploads and CLI inputs fail the same way.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file: Option<PdfUpload> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error("Failed to read form field", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = base_name(field.file_name().unwrap_or(""));
                if !is_pdf_name(&filename) {
                    return Err(ApiError::bad_request(
                        "invalid_file_type",
                        "Only PDF files are allowed",
                    ));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| read_error("Failed to read file data", e))?;
                file = Some(PdfUpload::new(filename, data.to_vec()));
            }
            "title" => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| read_error("Failed to read title", e))?;
                if !val.trim().is_empty() {
                    title = Some(val);
                }
            }
            _ => {
                field
                    .bytes()
                    .await
                    .map_err(|e| read_error("Failed to read form field", e))?;
            }
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("invalid_upload", "No file uploaded"))?;
    Ok(UploadForm { file, title })
}

/// Oversized bodies keep their 413; anything else is a malformed form.
fn read_error(context: &str, err: MultipartError) -> ApiError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::rejected(
            status,
            "payload_too_large",
            format!("Upload exceeds the size limit: {}", err.body_text()),
        );
    }
    ApiError::bad_request("invalid_upload", format!("{}: {}", context, err.body_text()))
}

fn is_pdf_name(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_check() {
        assert!(is_pdf_name("notes.pdf"));
        assert!(is_pdf_name("NOTES.PDF"));
        assert!(!is_pdf_name("notes.pdf.exe"));
        assert!(!is_pdf_name("notes.docx"));
        assert!(!is_pdf_name(""));
    }
}

//! Upload validation
//!
//! Size and type checks performed before anything is sent to storage.

use crate::config::UploadLimits;
use crate::error::ValidationError;
use crate::model::UploadFile;

/// Image formats accepted for profile and cover images
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

#[derive(Debug, Clone, Default)]
pub struct UploadValidator {
    limits: UploadLimits,
}

impl UploadValidator {
    pub fn new(limits: UploadLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn validate_profile_image(&self, file: &UploadFile) -> Result<(), ValidationError> {
        check_name(file)?;
        check_size(file, self.limits.profile_image_max_bytes())?;
        check_image_type(file)
    }

    pub fn validate_cover_image(&self, file: &UploadFile) -> Result<(), ValidationError> {
        check_name(file)?;
        check_size(file, self.limits.cover_image_max_bytes())?;
        check_image_type(file)
    }

    pub fn validate_attachment(&self, file: &UploadFile) -> Result<(), ValidationError> {
        check_name(file)?;
        check_size(file, self.limits.attachment_max_bytes())
    }

    pub fn validate_attachment_batch(&self, files: &[UploadFile]) -> Result<(), ValidationError> {
        if files.len() > self.limits.max_attachments_per_batch {
            return Err(ValidationError::TooManyFiles {
                count: files.len(),
                limit: self.limits.max_attachments_per_batch,
            });
        }
        files.iter().try_for_each(|f| self.validate_attachment(f))
    }
}

fn check_name(file: &UploadFile) -> Result<(), ValidationError> {
    if file.name.trim().is_empty() {
        Err(ValidationError::EmptyName)
    } else {
        Ok(())
    }
}

fn check_size(file: &UploadFile, limit: u64) -> Result<(), ValidationError> {
    if file.size() > limit {
        return Err(ValidationError::FileTooLarge {
            name: file.name.clone(),
            size: file.size(),
            limit,
        });
    }
    Ok(())
}

fn check_image_type(file: &UploadFile) -> Result<(), ValidationError> {
    let mime = file.mime_type.to_ascii_lowercase();
    if ACCEPTED_IMAGE_TYPES.contains(&mime.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedType {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    fn file(name: &str, mime: &str, size: usize) -> UploadFile {
        UploadFile::new(name, mime, vec![0u8; size])
    }

    #[test]
    fn profile_image_limit_is_five_megabytes() {
        let validator = UploadValidator::default();
        assert!(validator.validate_profile_image(&file("a.png", "image/png", 5 * MB)).is_ok());
        let err = validator
            .validate_profile_image(&file("a.png", "image/png", 6 * MB))
            .unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn cover_image_allows_ten_megabytes() {
        let validator = UploadValidator::default();
        assert!(validator.validate_cover_image(&file("c.jpg", "image/jpeg", 8 * MB)).is_ok());
        assert!(validator.validate_cover_image(&file("c.jpg", "image/jpeg", 11 * MB)).is_err());
    }

    #[test]
    fn only_jpeg_png_gif_are_images() {
        let validator = UploadValidator::default();
        assert!(validator.validate_profile_image(&file("a.gif", "IMAGE/GIF", 10)).is_ok());
        let err = validator
            .validate_profile_image(&file("a.webp", "image/webp", 10))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn attachment_batches_are_capped() {
        let validator = UploadValidator::default();
        let ten: Vec<_> = (0..10).map(|i| file(&format!("{i}.txt"), "text/plain", 1)).collect();
        assert!(validator.validate_attachment_batch(&ten).is_ok());

        let eleven: Vec<_> = (0..11).map(|i| file(&format!("{i}.txt"), "text/plain", 1)).collect();
        assert_eq!(
            validator.validate_attachment_batch(&eleven),
            Err(ValidationError::TooManyFiles { count: 11, limit: 10 })
        );
    }

    #[test]
    fn one_oversized_attachment_fails_the_batch() {
        let validator = UploadValidator::default();
        let batch = vec![file("ok.txt", "text/plain", 1), file("big.bin", "application/octet-stream", 6 * MB)];
        assert!(validator.validate_attachment_batch(&batch).is_err());
    }

    #[test]
    fn blank_names_are_rejected() {
        let validator = UploadValidator::default();
        assert_eq!(
            validator.validate_attachment(&file("  ", "text/plain", 1)),
            Err(ValidationError::EmptyName)
        );
    }
}

use axum::extract::Multipart;

use crate::{images::UploadedImage, AppResult};

use super::MAX_IMAGES;

/// Fields of the multipart listing form. Blank text fields come out as `None`.
#[derive(Debug, Default)]
pub(crate) struct ListingForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub location: Option<String>,
    /// Files from `image1`..`image4`, in slot order.
    pub images: Vec<UploadedImage>,
}

impl ListingForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = ListingForm::default();
        let mut slots: [Option<UploadedImage>; MAX_IMAGES] = Default::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            let text_slot = match name.as_str() {
                "title" => Some(&mut form.title),
                "description" => Some(&mut form.description),
                "category" => Some(&mut form.category),
                "country" => Some(&mut form.country),
                "location" => Some(&mut form.location),
                _ => None,
            };
            if let Some(slot) = text_slot {
                *slot = non_blank(field.text().await?);
                continue;
            }

            let Some(index) = image_slot(&name) else {
                tracing::debug!(field = %name, "ignoring unknown form field");
                continue;
            };

            let file_name = field.file_name().unwrap_or_default().to_owned();
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                continue;
            }

            slots[index] = Some(UploadedImage { file_name, content_type, bytes });
        }

        form.images = slots.into_iter().flatten().collect();
        Ok(form)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// `image1` → 0 … `image4` → 3.
fn image_slot(name: &str) -> Option<usize> {
    let index: usize = name.strip_prefix("image")?.parse().ok()?;
    (1..=MAX_IMAGES).contains(&index).then(|| index - 1)
}

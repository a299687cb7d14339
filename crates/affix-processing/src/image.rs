//! Reference image converter
//!
//! Handles any `image/*` input: applies EXIF orientation (on by default),
//! resizes according to the variant's `ResizeSpec` and encodes to the target
//! format (webp when unspecified). The output type is re-sniffed from the
//! encoded bytes; when that is inconclusive the input's type is kept rather
//! than raising.

use std::io::Cursor;

use affix_core::{
    ConvertInput, ConvertOutput, Converter, EncodeSpec, OutputFormat, ResizeFit, ResizeSpec,
    VariantSpec,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, Rgba, RgbaImage};

pub struct ImageConverter;

#[async_trait]
impl Converter for ImageConverter {
    async fn supports(&self, input: &ConvertInput<'_>) -> bool {
        input.mime_type.starts_with("image/")
    }

    async fn handle(&self, input: &ConvertInput<'_>, spec: &VariantSpec) -> Result<ConvertOutput> {
        let mut img = decode(input.buffer, spec.auto_orient)?;

        if let Some(resize) = &spec.resize {
            img = apply_resize(img, resize);
        }

        let encode = spec.format.unwrap_or_default();
        let buffer = encode_image(&img, &encode)?;

        // Re-sniff the encoded output; keep the input's type when inconclusive.
        let (mime_type, extname) = match infer::get(&buffer) {
            Some(kind) => (kind.mime_type().to_string(), kind.extension().to_string()),
            None => (input.mime_type.to_string(), input.extname.to_string()),
        };

        Ok(ConvertOutput {
            buffer: Bytes::from(buffer),
            mime_type,
            extname,
        })
    }
}

fn decode(data: &[u8], auto_orient: bool) -> Result<DynamicImage> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("failed to probe image format")?;
    let mut decoder = reader.into_decoder().context("failed to decode image")?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).context("failed to decode image")?;
    if auto_orient {
        img.apply_orientation(orientation);
    }
    Ok(img)
}

fn apply_resize(img: DynamicImage, spec: &ResizeSpec) -> DynamicImage {
    let (current_w, current_h) = (img.width(), img.height());
    // A single given dimension scales the other from the source aspect
    // ratio, so the fit mode only matters when both are set.
    let (width, height) = match (spec.width, spec.height) {
        (Some(w), Some(h)) => (w.max(1), h.max(1)),
        (Some(w), None) => {
            let w = w.max(1);
            let h = (w as f64 * current_h as f64 / current_w as f64).round() as u32;
            (w, h.max(1))
        }
        (None, Some(h)) => {
            let h = h.max(1);
            let w = (h as f64 * current_w as f64 / current_h as f64).round() as u32;
            (w.max(1), h)
        }
        (None, None) => (current_w, current_h),
    };

    if spec.without_enlargement && width >= current_w && height >= current_h {
        return img;
    }

    match spec.fit {
        ResizeFit::Cover => img.resize_to_fill(width, height, FilterType::Lanczos3),
        ResizeFit::Inside => img.resize(width, height, FilterType::Lanczos3),
        ResizeFit::Fill => img.resize_exact(width, height, FilterType::Lanczos3),
        ResizeFit::Outside => {
            let scale = f64::max(
                width as f64 / current_w as f64,
                height as f64 / current_h as f64,
            );
            let w = ((current_w as f64 * scale).round() as u32).max(1);
            let h = ((current_h as f64 * scale).round() as u32).max(1);
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        ResizeFit::Contain => {
            let resized = img.resize(width, height, FilterType::Lanczos3);
            let background = spec.background.unwrap_or([0, 0, 0, 0]);
            let mut canvas = RgbaImage::from_pixel(width, height, Rgba(background));
            let x = (width - resized.width()) / 2;
            let y = (height - resized.height()) / 2;
            image::imageops::overlay(&mut canvas, &resized.to_rgba8(), x as i64, y as i64);
            DynamicImage::ImageRgba8(canvas)
        }
    }
}

fn encode_image(img: &DynamicImage, spec: &EncodeSpec) -> Result<Vec<u8>> {
    match spec.format {
        OutputFormat::Webp => {
            let rgba = img.to_rgba8();
            let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
            let encoded = if spec.lossless {
                encoder.encode_lossless()
            } else {
                encoder.encode(f32::from(spec.quality.unwrap_or(80)))
            };
            Ok(encoded.to_vec())
        }
        OutputFormat::Jpeg => {
            let mut buffer = Vec::new();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut buffer,
                spec.quality.unwrap_or(85),
            );
            // JPEG has no alpha channel
            img.to_rgb8()
                .write_with_encoder(encoder)
                .context("jpeg encoding failed")?;
            Ok(buffer)
        }
        OutputFormat::Png => {
            let mut cursor = Cursor::new(Vec::new());
            img.write_to(&mut cursor, ImageFormat::Png)
                .context("png encoding failed")?;
            Ok(cursor.into_inner())
        }
        OutputFormat::Gif => {
            let mut cursor = Cursor::new(Vec::new());
            img.write_to(&mut cursor, ImageFormat::Gif)
                .context("gif encoding failed")?;
            Ok(cursor.into_inner())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_image(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 120, 255, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn input<'a>(buffer: &'a [u8], spec: &'a VariantSpec) -> ConvertInput<'a> {
        ConvertInput {
            buffer,
            size: buffer.len() as u64,
            mime_type: "image/png",
            extname: "png",
            variant_name: "thumbnail",
            variant: spec,
        }
    }

    #[tokio::test]
    async fn test_supports_images_only() {
        let spec = VariantSpec::default();
        let data = png_image(8, 8);
        let converter = ImageConverter;
        assert!(converter.supports(&input(&data, &spec)).await);

        let pdf_input = ConvertInput {
            mime_type: "application/pdf",
            extname: "pdf",
            ..input(&data, &spec)
        };
        assert!(!converter.supports(&pdf_input).await);
    }

    #[tokio::test]
    async fn test_default_output_is_webp() {
        let spec = VariantSpec::default();
        let data = png_image(16, 16);
        let output = ImageConverter.handle(&input(&data, &spec), &spec).await.unwrap();
        assert_eq!(output.mime_type, "image/webp");
        assert_eq!(output.extname, "webp");
        assert!(!output.buffer.is_empty());
    }

    #[tokio::test]
    async fn test_resize_cover_dimensions() {
        let spec = VariantSpec {
            resize: Some(ResizeSpec {
                width: Some(10),
                height: Some(10),
                ..ResizeSpec::default()
            }),
            format: Some(EncodeSpec::from(OutputFormat::Png)),
            ..VariantSpec::default()
        };
        let data = png_image(40, 20);
        let output = ImageConverter.handle(&input(&data, &spec), &spec).await.unwrap();
        let img = image::load_from_memory(&output.buffer).unwrap();
        assert_eq!((img.width(), img.height()), (10, 10));
    }

    #[tokio::test]
    async fn test_resize_inside_keeps_aspect() {
        let spec = VariantSpec {
            resize: Some(ResizeSpec {
                width: Some(10),
                height: Some(10),
                fit: ResizeFit::Inside,
                ..ResizeSpec::default()
            }),
            format: Some(EncodeSpec::from(OutputFormat::Png)),
            ..VariantSpec::default()
        };
        let data = png_image(40, 20);
        let output = ImageConverter.handle(&input(&data, &spec), &spec).await.unwrap();
        let img = image::load_from_memory(&output.buffer).unwrap();
        assert_eq!((img.width(), img.height()), (10, 5));
    }

    #[tokio::test]
    async fn test_width_only_resize_keeps_aspect() {
        let spec = VariantSpec {
            resize: Some(ResizeSpec {
                width: Some(10),
                ..ResizeSpec::default()
            }),
            format: Some(EncodeSpec::from(OutputFormat::Png)),
            ..VariantSpec::default()
        };
        let data = png_image(40, 20);
        let output = ImageConverter.handle(&input(&data, &spec), &spec).await.unwrap();
        let img = image::load_from_memory(&output.buffer).unwrap();
        assert_eq!((img.width(), img.height()), (10, 5));
    }

    #[tokio::test]
    async fn test_height_only_resize_keeps_aspect() {
        let spec = VariantSpec {
            resize: Some(ResizeSpec {
                height: Some(10),
                ..ResizeSpec::default()
            }),
            format: Some(EncodeSpec::from(OutputFormat::Png)),
            ..VariantSpec::default()
        };
        let data = png_image(40, 20);
        let output = ImageConverter.handle(&input(&data, &spec), &spec).await.unwrap();
        let img = image::load_from_memory(&output.buffer).unwrap();
        assert_eq!((img.width(), img.height()), (20, 10));
    }

    #[tokio::test]
    async fn test_contain_pads_to_box() {
        let spec = VariantSpec {
            resize: Some(ResizeSpec {
                width: Some(10),
                height: Some(10),
                fit: ResizeFit::Contain,
                background: Some([255, 255, 255, 255]),
                ..ResizeSpec::default()
            }),
            format: Some(EncodeSpec::from(OutputFormat::Png)),
            ..VariantSpec::default()
        };
        let data = png_image(40, 20);
        let output = ImageConverter.handle(&input(&data, &spec), &spec).await.unwrap();
        let img = image::load_from_memory(&output.buffer).unwrap();
        assert_eq!((img.width(), img.height()), (10, 10));
    }

    #[tokio::test]
    async fn test_without_enlargement() {
        let spec = VariantSpec {
            resize: Some(ResizeSpec {
                width: Some(100),
                height: Some(100),
                without_enlargement: true,
                ..ResizeSpec::default()
            }),
            format: Some(EncodeSpec::from(OutputFormat::Png)),
            ..VariantSpec::default()
        };
        let data = png_image(16, 16);
        let output = ImageConverter.handle(&input(&data, &spec), &spec).await.unwrap();
        let img = image::load_from_memory(&output.buffer).unwrap();
        assert_eq!((img.width(), img.height()), (16, 16));
    }

    #[tokio::test]
    async fn test_jpeg_quality_option() {
        let spec = VariantSpec {
            format: Some(EncodeSpec {
                format: OutputFormat::Jpeg,
                quality: Some(40),
                lossless: false,
            }),
            ..VariantSpec::default()
        };
        let data = png_image(32, 32);
        let output = ImageConverter.handle(&input(&data, &spec), &spec).await.unwrap();
        assert_eq!(output.mime_type, "image/jpeg");
        assert_eq!(output.extname, "jpg");
    }

    #[tokio::test]
    async fn test_handle_invalid_image_fails() {
        let spec = VariantSpec::default();
        let data = b"not an image".to_vec();
        let bad = ConvertInput {
            buffer: &data,
            ..input(&data, &spec)
        };
        assert!(ImageConverter.handle(&bad, &spec).await.is_err());
    }
}

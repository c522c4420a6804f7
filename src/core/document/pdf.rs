use super::DocumentAssembler;
use crate::core::config::DocumentConfig;
use crate::core::error::{Result, SheetError};
use crate::core::sheet::PageImage;
use image::ImageOutputFormat;
use log::info;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;

/// 每页一张图，页面尺寸按 DPI 由像素换算为 PDF 点
pub struct PdfAssembler {
    config: DocumentConfig,
}

impl PdfAssembler {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    fn encode_jpeg(&self, page: &PageImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        page.image()
            .write_to(&mut buffer, ImageOutputFormat::Jpeg(self.config.jpeg_quality))?;
        Ok(buffer.into_inner())
    }

    fn page_size(&self, page: &PageImage) -> (f32, f32) {
        let (w, h) = page.dimensions();
        let scale = 72.0 / self.config.dpi;
        ((w as f64 * scale) as f32, (h as f64 * scale) as f32)
    }

    fn add_page(&self, doc: &mut Document, pages_id: ObjectId, page: &PageImage) -> Result<ObjectId> {
        let (width, height) = page.dimensions();
        let (page_w, page_h) = self.page_size(page);

        let mut image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            self.encode_jpeg(page)?,
        );
        // JPEG 数据已压缩
        image_stream.allows_compression = false;
        let image_id = doc.add_object(image_stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        page_w.into(),
                        0.into(),
                        0.into(),
                        page_h.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        Ok(page_id)
    }
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new(DocumentConfig::default())
    }
}

impl DocumentAssembler for PdfAssembler {
    fn assemble(&self, pages: &[PageImage], dest: &Path) -> Result<()> {
        if pages.is_empty() {
            return Err(SheetError::EmptyDocument);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            kids.push(Object::Reference(self.add_page(&mut doc, pages_id, page)?));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => pages.len() as i64,
                "Kids" => kids,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(dest)?);
        doc.save_to(&mut writer)?;

        info!("📑 Wrote {} pages to {}", pages.len(), dest.display());
        Ok(())
    }
}

//! PDF rasterisation via pdfium.
//!
//! Pages are rendered one at a time and handed to a callback, so a long
//! prescription bundle never holds more than one 300 DPI bitmap in memory.
//! Everything here is blocking; callers run it inside `spawn_blocking`.

use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Rendering parameters for one document.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
}

/// Bind to pdfium: an explicit library path, else `./`, else the system copy.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, String> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| format!("failed to bind to pdfium library: {e:?}"))?;
    Ok(Pdfium::new(bindings))
}

/// Rasterise every page of the PDF at `pdf_path`, in page order.
///
/// `on_page` receives the 1-based page number and the rendered image. The
/// first error (from pdfium or from `on_page`) stops rendering.
pub fn render_each_page<F>(
    pdfium: &Pdfium,
    pdf_path: &Path,
    opts: RenderOptions,
    mut on_page: F,
) -> Result<usize, String>
where
    F: FnMut(usize, DynamicImage) -> Result<(), String>,
{
    let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            "PDF is encrypted and requires a password".to_string()
        } else {
            format!("PDF is corrupt: {err_str}")
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(opts.dpi as f32 / 72.0)
        .set_maximum_width(opts.max_rendered_pixels as i32)
        .set_maximum_height(opts.max_rendered_pixels as i32);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("rasterisation failed for page {page_num}: {e:?}"))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );
        on_page(page_num, image)?;
    }

    Ok(total_pages)
}

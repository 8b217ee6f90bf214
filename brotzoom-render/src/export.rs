//! PNG export with embedded view metadata (tEXt chunks).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

use brotzoom_core::Viewport;

use crate::buffer::RenderBuffer;

const SOFTWARE: &str = "brotzoom";

/// What gets written next to the pixels so a frame can be located again.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    pub min_re: f64,
    pub max_re: f64,
    pub min_im: f64,
    pub max_im: f64,
    pub center_re: f64,
    pub center_im: f64,
    pub max_iterations: u32,
    pub palette_name: String,
    pub width: u32,
    pub height: u32,
}

impl ExportMetadata {
    pub fn new(
        viewport: &Viewport,
        buffer: &RenderBuffer,
        max_iterations: u32,
        palette_name: &str,
    ) -> Self {
        Self {
            min_re: viewport.min_re(),
            max_re: viewport.max_re(),
            min_im: viewport.min_im(),
            max_im: viewport.max_im(),
            center_re: viewport.center_re(),
            center_im: viewport.center_im(),
            max_iterations,
            palette_name: palette_name.to_owned(),
            width: buffer.width,
            height: buffer.height,
        }
    }

    fn description(&self) -> String {
        format!(
            "Mandelbrot - Center: {} {}i, Re: [{}, {}], Im: [{}, {}], Iterations: {}",
            self.center_re,
            self.center_im,
            self.min_re,
            self.max_re,
            self.min_im,
            self.max_im,
            self.max_iterations,
        )
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("brotzoom.MinRe", self.min_re.to_string()),
            ("brotzoom.MaxRe", self.max_re.to_string()),
            ("brotzoom.MinIm", self.min_im.to_string()),
            ("brotzoom.MaxIm", self.max_im.to_string()),
            ("brotzoom.CenterRe", self.center_re.to_string()),
            ("brotzoom.CenterIm", self.center_im.to_string()),
            ("brotzoom.MaxIterations", self.max_iterations.to_string()),
            ("brotzoom.Palette", self.palette_name.clone()),
            (
                "brotzoom.Resolution",
                format!("{}x{}", self.width, self.height),
            ),
        ]
    }
}

/// Write `buffer` as an 8-bit RGBA PNG with `metadata` in tEXt chunks.
pub fn export_png(
    buffer: &RenderBuffer,
    path: &Path,
    metadata: &ExportMetadata,
) -> crate::Result<()> {
    let writer = BufWriter::new(File::create(path)?);

    let mut encoder = png::Encoder::new(writer, buffer.width, buffer.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder.add_text_chunk("Software".to_string(), SOFTWARE.to_string())?;
    encoder.add_text_chunk("Description".to_string(), metadata.description())?;
    for (key, value) in metadata.pairs() {
        encoder.add_text_chunk(key.to_string(), value)?;
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&buffer.pixels)?;
    png_writer.finish()?;

    debug!(
        width = buffer.width,
        height = buffer.height,
        path = %path.display(),
        "Exported PNG"
    );
    Ok(())
}

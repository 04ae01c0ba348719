use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::OutlineArgs;
use crate::model::DocumentOutline;
use crate::outline::OutlineParser;
use crate::render::{PdfRenderer, load_pages_json};
use crate::util::{discover_pdfs, ensure_directory, to_json_string, write_json};

pub fn run(args: OutlineArgs) -> Result<()> {
    let parser = OutlineParser::new()?;

    if let Some(input_dir) = args.input_dir.as_deref() {
        let Some(output_dir) = args.output_dir.as_deref() else {
            bail!("--output-dir is required with --input-dir");
        };
        let renderer = PdfRenderer::new()?;
        return run_directory(&parser, &renderer, input_dir, output_dir, &args);
    }

    let pages = if let Some(pages_json) = args.pages_json.as_deref() {
        load_pages_json(pages_json)?
    } else {
        let Some(pdf_path) = args.pdf_path.as_deref() else {
            bail!("a PDF path, --pages-json or --input-dir is required");
        };
        if !pdf_path.exists() {
            bail!("PDF file not found: {}", pdf_path.display());
        }
        PdfRenderer::new()?.render_pdf(pdf_path, args.max_pages)?
    };

    if let Some(emit_pages) = args.emit_pages.as_deref() {
        write_json(emit_pages, &pages, args.pretty)?;
        info!(path = %emit_pages.display(), pages = pages.len(), "wrote page records");
    }

    let outline = parser.build_outline(&pages);
    info!(
        title = %outline.title,
        pages = pages.len(),
        headings = outline.outline.len(),
        "outline extracted"
    );

    match args.output.as_deref() {
        Some(output) => {
            write_json(output, &outline, args.pretty)?;
            info!(path = %output.display(), "wrote outline");
        }
        None => print_outline(&outline, args.pretty)?,
    }

    Ok(())
}

fn run_directory(
    parser: &OutlineParser,
    renderer: &PdfRenderer,
    input_dir: &Path,
    output_dir: &Path,
    args: &OutlineArgs,
) -> Result<()> {
    let pdfs = discover_pdfs(input_dir)?;
    if pdfs.is_empty() {
        bail!("no PDFs found in {}", input_dir.display());
    }
    ensure_directory(output_dir)?;

    let mut written = 0usize;
    for pdf_path in &pdfs {
        let pages = match renderer.render_pdf(pdf_path, args.max_pages) {
            Ok(pages) => pages,
            Err(error) => {
                warn!(path = %pdf_path.display(), error = %error, "skipping unreadable pdf");
                continue;
            }
        };

        let outline = parser.build_outline(&pages);
        let output_path = output_dir.join(output_file_name(pdf_path));
        write_json(&output_path, &outline, args.pretty)?;
        written += 1;

        info!(
            path = %output_path.display(),
            title = %outline.title,
            headings = outline.outline.len(),
            "wrote outline"
        );
    }

    if written == 0 {
        bail!("no outline could be extracted from {}", input_dir.display());
    }

    info!(processed = written, discovered = pdfs.len(), "outline batch completed");
    Ok(())
}

fn output_file_name(pdf_path: &Path) -> String {
    let stem = pdf_path
        .file_stem()
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}.json")
}

fn print_outline(outline: &DocumentOutline, pretty: bool) -> Result<()> {
    let json = to_json_string(outline, pretty)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}").context("failed to write outline to stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn directory_args(input_dir: &Path, output_dir: &Path) -> OutlineArgs {
        OutlineArgs {
            pdf_path: None,
            pages_json: None,
            input_dir: Some(input_dir.to_path_buf()),
            output_dir: Some(output_dir.to_path_buf()),
            output: None,
            pretty: false,
            emit_pages: None,
            max_pages: None,
        }
    }

    #[test]
    fn output_file_name_uses_the_pdf_stem() {
        assert_eq!(output_file_name(Path::new("/data/Annual Report.PDF")), "Annual Report.json");
        assert_eq!(output_file_name(Path::new("nested/file.v2.pdf")), "file.v2.json");
    }

    #[test]
    fn directory_mode_fails_when_every_pdf_is_unreadable() {
        let input = tempdir().expect("input dir");
        let output = tempdir().expect("output dir");
        fs::write(input.path().join("broken.pdf"), b"not a pdf").expect("write junk pdf");
        fs::write(input.path().join("ALSO_BROKEN.PDF"), b"%PDF-garbage").expect("write junk pdf");
        fs::write(input.path().join("notes.txt"), b"ignored").expect("write other file");

        let error = run(directory_args(input.path(), output.path()))
            .expect_err("unreadable pdfs must fail the batch");
        assert!(
            error.to_string().contains("no outline could be extracted"),
            "unexpected error: {error:#}"
        );

        let written = fs::read_dir(output.path()).expect("read output dir").count();
        assert_eq!(written, 0);
    }

    #[test]
    fn directory_mode_without_pdfs_is_an_error() {
        let input = tempdir().expect("input dir");
        let output = tempdir().expect("output dir");

        let error = run(directory_args(input.path(), output.path()))
            .expect_err("empty directory must fail");
        assert!(error.to_string().contains("no PDFs found"));
    }
}

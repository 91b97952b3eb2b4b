//! roi-edit - author named masks of polygonal regions from the command line
//!
//! Every successful edit is written straight back to the region document.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use roi_regions::{Point, RegionEditor, RegionStore, REFERENCE_HEIGHT, REFERENCE_WIDTH};
use runtime::init_logging;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Edit ROI masks and regions")]
struct Args {
    /// Region document to edit (created if missing)
    #[arg(long, env = "ROI_GUARD_REGIONS", default_value = "regions.json")]
    regions: PathBuf,

    /// Canvas width points are clamped to
    #[arg(long, default_value_t = REFERENCE_WIDTH)]
    width: u32,

    /// Canvas height points are clamped to
    #[arg(long, default_value_t = REFERENCE_HEIGHT)]
    height: u32,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show masks and their regions
    List,
    /// Create an empty mask
    AddMask { name: String },
    RenameMask { from: String, to: String },
    DeleteMask { name: String },
    /// Add a rectangle spanned by two opposite corners, given as x,y
    AddRect {
        #[arg(long)]
        mask: Option<String>,
        #[arg(value_parser = parse_point)]
        corner_a: Point,
        #[arg(value_parser = parse_point)]
        corner_b: Point,
    },
    /// Add a polygon from three or more x,y points in any order
    AddPolygon {
        #[arg(long)]
        mask: Option<String>,
        #[arg(value_parser = parse_point, required = true)]
        points: Vec<Point>,
    },
    RenameRegion {
        #[arg(long)]
        mask: Option<String>,
        from: String,
        to: String,
    },
    DeleteRegion {
        #[arg(long)]
        mask: Option<String>,
        name: String,
    },
    /// Remove every region of a mask
    ClearRegions {
        #[arg(long)]
        mask: Option<String>,
    },
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x = x.trim().parse::<i32>().map_err(|e| format!("bad x in '{}': {}", s, e))?;
    let y = y.trim().parse::<i32>().map_err(|e| format!("bad y in '{}': {}", s, e))?;
    Ok(Point::new(x, y))
}

fn select(editor: &mut RegionEditor, mask: Option<&str>) -> Result<()> {
    if let Some(name) = mask {
        editor.select_mask(name)?;
    }
    if editor.selected_mask().is_none() {
        return Err(anyhow!("No mask to edit; create one with add-mask"));
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, false)?;

    let store = RegionStore::new(&args.regions);
    let mut editor = RegionEditor::new(store.load_or_default(), (args.width, args.height));

    match &args.command {
        Command::List => {
            print_document(&editor);
            return Ok(());
        }
        Command::AddMask { name } => editor.add_mask(name)?,
        Command::RenameMask { from, to } => editor.rename_mask(from, to)?,
        Command::DeleteMask { name } => editor.delete_mask(name)?,
        Command::AddRect {
            mask,
            corner_a,
            corner_b,
        } => {
            select(&mut editor, mask.as_deref())?;
            let name = editor.add_rect_region(*corner_a, *corner_b)?;
            println!("Added {}", name);
        }
        Command::AddPolygon { mask, points } => {
            select(&mut editor, mask.as_deref())?;
            let name = editor.add_polygon_region(points)?;
            println!("Added {}", name);
        }
        Command::RenameRegion { mask, from, to } => {
            select(&mut editor, mask.as_deref())?;
            editor.rename_region(from, to)?;
        }
        Command::DeleteRegion { mask, name } => {
            select(&mut editor, mask.as_deref())?;
            editor.delete_region(name)?;
        }
        Command::ClearRegions { mask } => {
            select(&mut editor, mask.as_deref())?;
            let removed = editor.clear_regions()?;
            println!("Removed {} region(s)", removed);
        }
    }

    if editor.can_undo() {
        store
            .save(editor.document())
            .with_context(|| format!("Failed to save {}", store.path().display()))?;
    }
    Ok(())
}

fn print_document(editor: &RegionEditor) {
    let document = editor.document();
    if document.is_empty() {
        println!("(no masks)");
        return;
    }
    for mask_name in document.mask_names() {
        let marker = if editor.selected_mask() == Some(mask_name) {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, mask_name);
        let Ok(mask) = document.mask(mask_name) else {
            continue;
        };
        for region in mask.region_names() {
            if let Some(polygon) = mask.region(region) {
                let points: Vec<String> = polygon
                    .points()
                    .iter()
                    .map(|p| format!("({},{})", p.x, p.y))
                    .collect();
                println!("    {}: {}", region, points.join(" "));
            }
        }
    }
}

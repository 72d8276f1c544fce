use clap::Parser;
use hipaudit_core::analysis::{build_metrics_table, select_for_snapshot, RadiopediaSummary};
use hipaudit_core::audit::{
    audit_dataset, find_outliers, list_dataset2_images, list_files_by_stem,
    load_annotation_stems, DatasetKind,
};
use hipaudit_core::cli::report::{
    HighAceReport, InventoryTextReport, OutlierTextReport, RadiopediaTextReport,
};
use hipaudit_core::cli::{
    default_label_path, ultrasound_sample_paths, Cli, Commands, InventoryLayout, OutputFormat,
};
use hipaudit_core::extraction::load_ultrasound_records;
use hipaudit_core::render::{
    init_fonts, render_mtddh_snapshot, render_pose_overlay, render_radiopedia_snapshot,
    render_ultrasound_overlay,
};
use hipaudit_core::{HipAuditError, OutlierCatalog, Result, SnapshotFilter};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;
use std::process;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    init_fonts(cli.font.as_deref());

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Outliers {
            data_dir,
            output,
            catalog,
            format,
        } => run_outliers(&data_dir, &output, catalog.as_deref(), format),
        Commands::Inventory {
            raw_root,
            data_dir,
            format,
        } => run_inventory(&raw_root, &data_dir, format),
        Commands::MtddhSnapshot {
            root,
            out_dir,
            file_name,
            exclude_groups,
            ace_limit,
        } => {
            let filter = exclude_groups
                .into_iter()
                .fold(SnapshotFilter::permissive(), |f, g| f.exclude_group(g))
                .with_ace_limit(ace_limit);
            run_mtddh_snapshot(&root, &out_dir.join(file_name), &filter)
        }
        Commands::RadiopediaSnapshot {
            data_dir,
            sample_image,
            output,
            format,
        } => run_radiopedia_snapshot(&data_dir, &sample_image, &output, format),
        Commands::ShowPose {
            image,
            label,
            output,
        } => {
            let label = label.unwrap_or_else(|| default_label_path(&image));
            render_pose_overlay(&image, &label, &output)?;
            println!("Pose overlay saved to {}", output.display());
            Ok(())
        }
        Commands::ShowUltrasound {
            data_dir,
            sample_id,
            output,
        } => {
            let (image, mask, json) = ultrasound_sample_paths(&data_dir, &sample_id);
            render_ultrasound_overlay(&image, &mask, Some(&json), &output)?;
            println!("Ultrasound overlay saved to {}", output.display());
            Ok(())
        }
    }
}

fn run_outliers(
    data_dir: &Path,
    output: &Path,
    catalog: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let catalog = match catalog {
        Some(path) => OutlierCatalog::from_file(path)?,
        None => OutlierCatalog::default(),
    };

    let report = find_outliers(data_dir, &catalog)?;
    report.write_json(output)?;

    match format {
        OutputFormat::Text => println!("{}", OutlierTextReport::new(&report, output)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn run_inventory(raw_root: &Path, data_dir: &Path, format: OutputFormat) -> Result<()> {
    if !raw_root.is_dir() {
        return Err(HipAuditError::DirectoryNotFound(raw_root.to_path_buf()));
    }
    let layout = InventoryLayout::new(raw_root);

    let mut dataset1 = BTreeMap::new();
    for dir in &layout.dataset1_dirs {
        if dir.is_dir() {
            dataset1.extend(list_files_by_stem(dir)?);
        } else {
            warn!("Directory not found: {}", dir.display());
        }
    }
    let annotations = load_annotation_stems(&layout.dataset1_annotations)?;
    let dataset1_report =
        audit_dataset(DatasetKind::Dataset1, &dataset1, data_dir, Some(&annotations))?;

    let dataset2 = if layout.dataset2_dir.is_dir() {
        list_dataset2_images(&layout.dataset2_dir)?
    } else {
        warn!("Directory not found: {}", layout.dataset2_dir.display());
        BTreeMap::new()
    };
    let dataset2_report = audit_dataset(DatasetKind::Dataset2, &dataset2, data_dir, None)?;

    let reports = [dataset1_report, dataset2_report];
    match format {
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", InventoryTextReport::new(report));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}

fn run_mtddh_snapshot(root: &Path, out_path: &Path, filter: &SnapshotFilter) -> Result<()> {
    info!("Loading metrics from: {}", root.display());
    let table = build_metrics_table(root)?;
    info!(
        "Loaded {} rows and {} columns.",
        table.len(),
        table.column_count()
    );
    if table.is_empty() {
        return Err(HipAuditError::NoData(format!(
            "no metrics.json files under {}",
            root.display()
        )));
    }

    let selection = select_for_snapshot(&table, filter);
    if !selection.high_ace.is_empty() {
        println!("{}", HighAceReport::new(&selection.high_ace, filter.ace_limit));
    }

    info!("Creating snapshot plots...");
    render_mtddh_snapshot(&selection, out_path)?;
    println!("Snapshot saved under: {}", out_path.display());
    Ok(())
}

fn run_radiopedia_snapshot(
    data_dir: &Path,
    sample_image: &Path,
    output: &Path,
    format: OutputFormat,
) -> Result<()> {
    let records = load_ultrasound_records(data_dir)?;
    if records.is_empty() {
        return Err(HipAuditError::NoData(format!(
            "no JSON records in {}",
            data_dir.display()
        )));
    }
    info!("Loaded {} ultrasound records", records.len());

    let summary = RadiopediaSummary::from_records(&records);
    render_radiopedia_snapshot(&records, &summary, Some(sample_image), output)?;
    println!("Snapshot saved to: {}", output.display());

    match format {
        OutputFormat::Text => println!("{}", RadiopediaTextReport::new(&summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

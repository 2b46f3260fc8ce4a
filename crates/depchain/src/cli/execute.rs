//! Command execution logic.

use anyhow::Result;

use super::args::{
    IngestArgs, InitArgs, ListArgs, ReachableArgs, RebuildArgs, ResolveArgs, SearchArgs,
};
use crate::app::App;
use crate::commands::ingest::{ingest_file, ScanOrigin};
use crate::domain::{
    LicenseFilter, OccurrenceFilter, OccurrenceId, OrganizationId, ProjectId, SourceId,
};
use crate::output::{self, OccurrenceRow, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir).await?;

    if !args.quiet {
        println!("Initialized depchain in {}", result.depchain_dir.display());
        println!("  Config:   {}", result.config_file.display());
        println!("  Snapshot: {}", result.snapshot_file.display());
    }
    Ok(())
}

/// Execute the ingest command
pub async fn execute_ingest(app: &App, args: &IngestArgs, output_mode: OutputMode) -> Result<()> {
    let report = ingest_file(
        app.engine(),
        &args.file,
        ScanOrigin {
            organization_id: OrganizationId::new(args.organization),
            project_id: ProjectId::new(args.project),
            source_id: SourceId::new(args.source),
            commit_sha: args.commit.clone(),
        },
    )
    .await?;
    app.save().await?;

    output::print_scan_report(&report, output_mode)?;
    Ok(())
}

/// Execute the resolve command
pub async fn execute_resolve(app: &App, args: &ResolveArgs, output_mode: OutputMode) -> Result<()> {
    let resolution = app
        .engine()
        .resolve(OccurrenceId::new(args.occurrence), ProjectId::new(args.project))
        .await?;
    output::print_resolution(&resolution, output_mode)?;
    Ok(())
}

/// Execute the reachable command
pub async fn execute_reachable(
    app: &App,
    args: &ReachableArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let ancestor = OccurrenceId::new(args.ancestor);
    let descendant = OccurrenceId::new(args.descendant);
    let distance = app.engine().is_descendant(ancestor, descendant).await?;
    output::print_reachability(ancestor, descendant, distance, output_mode)?;
    Ok(())
}

/// Execute the list command
pub async fn execute_list(app: &App, args: &ListArgs, output_mode: OutputMode) -> Result<()> {
    let filter = OccurrenceFilter {
        project_id: args.project.map(ProjectId::new),
        source_id: args.source.map(SourceId::new),
        name: args.name.clone(),
        package_managers: args.package_managers.clone(),
        licenses: args.licenses.iter().map(|l| LicenseFilter::parse(l)).collect(),
        limit: Some(args.limit),
    };

    let storage = app.engine().storage();
    let occurrences = storage.list_occurrences(&filter, args.sort()).await?;

    let mut rows = Vec::with_capacity(occurrences.len());
    for occurrence in occurrences {
        if let Some(node) = storage
            .occurrence_node(occurrence.project_id, occurrence.id)
            .await?
        {
            rows.push(OccurrenceRow::new(occurrence, node.coordinate));
        }
    }

    output::print_occurrences(&rows, output_mode)?;
    Ok(())
}

/// Execute the search command
pub async fn execute_search(app: &App, args: &SearchArgs, output_mode: OutputMode) -> Result<()> {
    let components = app
        .engine()
        .storage()
        .search_components(OrganizationId::new(args.organization), &args.query, args.limit)
        .await?;
    output::print_components(&components, output_mode)?;
    Ok(())
}

/// Execute the rebuild command
pub async fn execute_rebuild(app: &App, args: &RebuildArgs, output_mode: OutputMode) -> Result<()> {
    let rebuilt = match args.project {
        Some(project) => {
            let project_id = ProjectId::new(project);
            vec![(project_id, app.engine().rebuild_closure(project_id).await?)]
        }
        None => app.engine().rebuild_all().await?,
    };
    app.save().await?;

    match output_mode {
        OutputMode::Json => {
            let summary: Vec<_> = rebuilt
                .iter()
                .map(|(project, rows)| serde_json::json!({ "project": project, "rows": rows }))
                .collect();
            output::print_json(&summary)?;
        }
        OutputMode::Text => {
            if rebuilt.is_empty() {
                println!("No projects to rebuild.");
            }
            for (project, rows) in rebuilt {
                println!("Rebuilt project {project}: {rows} closure row(s)");
            }
        }
    }
    Ok(())
}

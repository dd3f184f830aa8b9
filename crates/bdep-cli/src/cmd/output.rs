//! Result rendering

use anyhow::Result;
use bdep_core::{ResolutionResult, ResolvedPackage};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};

/// Print a result as JSON or as a table on stdout
pub fn print(result: &ResolutionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.is_empty() {
        println!("No packages resolved in {}.", result.branch);
        return Ok(());
    }

    println!("{}", table(result));
    println!("{} package(s) in {}", result.len(), result.branch);
    Ok(())
}

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn row(position: usize, package: &ResolvedPackage) -> Vec<String> {
    let evr = if package.epoch == 0 {
        format!("{}-{}", package.version, package.release)
    } else {
        format!("{}:{}-{}", package.epoch, package.version, package.release)
    };

    vec![
        position.to_string(),
        package.name.to_string(),
        evr,
        package.depth.to_string(),
        join(&package.archs),
        package.build_time.format("%Y-%m-%d").to_string(),
        join(&package.requires),
        join(&package.cycle),
        join(&package.acl),
    ]
}

/// Build order table, one row per package
pub fn table(result: &ResolutionResult) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "#", "Package", "Version", "Depth", "Archs", "Built", "Requires", "Cycle", "ACL",
        ]);

    for (i, package) in result.packages.iter().enumerate() {
        table.add_row(row(i + 1, package));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdep_schema::{Arch, PackageName};
    use chrono::DateTime;

    fn package(name: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: PackageName::new(name),
            version: "2.41".into(),
            release: "alt1".into(),
            epoch: 6,
            serial: 0,
            source_rpm: format!("{name}-2.41-alt1.src.rpm"),
            branch: "sisyphus".into(),
            archs: [Arch::X86_64, Arch::Noarch].into_iter().collect(),
            build_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            cycle: vec![PackageName::new("glibc-preinstall")],
            requires: vec![PackageName::new("gcc"), PackageName::new("make")],
            acl: vec!["@core".into()],
            depth: 2,
        }
    }

    #[test]
    fn rows_show_evr_and_lists() {
        let cells = row(1, &package("glibc"));
        assert_eq!(cells[1], "glibc");
        assert_eq!(cells[2], "6:2.41-alt1");
        assert_eq!(cells[4], "noarch, x86_64");
        assert_eq!(cells[5], "2023-11-14");
        assert_eq!(cells[6], "gcc, make");
        assert_eq!(cells[7], "glibc-preinstall");
    }

    #[test]
    fn table_has_a_row_per_package() {
        let result = ResolutionResult {
            branch: "sisyphus".into(),
            packages: vec![package("glibc"), package("bash")],
        };
        let rendered = table(&result).to_string();
        assert!(rendered.contains("glibc"));
        assert!(rendered.contains("bash"));
        assert_eq!(table(&result).row_iter().count(), 2);
    }
}

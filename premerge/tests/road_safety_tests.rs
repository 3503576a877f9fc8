use anyhow::{Context, Result};
use assert_cmd::prelude::*;
use datafusion::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const DATASET: &str = "data/raw/dft_road_safety_last_5_years";

/// Throwaway copy of the road-safety demo project.
struct PremergeTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl PremergeTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let project_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .context("Workspace root not found")?
            .join("demos/road_safety");

        let dest = tmp.path().join("road_safety");
        Self::copy_dir(&project_root, &dest)?;

        Ok(Self {
            _tmp: tmp,
            root: dest,
        })
    }

    fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.skip_exist = true;
        options.content_only = true;

        fs::create_dir_all(dst)?;
        fs_extra::dir::copy(src, dst, &options)
            .map(|_| ())
            .map_err(|e| std::io::Error::other(e.to_string()))
    }

    fn premerge(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("premerge"));
        cmd.current_dir(&self.root);
        cmd.env_remove("PREMERGE_DATA_DIR");
        cmd.env_remove("PREMERGE_OUTPUT_PATH");
        cmd.env_remove("PREMERGE_PROCESSED_PATH");
        cmd
    }

    fn report(&self) -> Result<Value> {
        let content = fs::read_to_string(self.root.join("reports/profile_report.json"))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn append(&self, file: &str, line: &str) -> Result<()> {
        let path = self.root.join(DATASET).join(file);
        let mut content = fs::read_to_string(&path)?;
        content.push_str(line);
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }
}

async fn parquet_rows(path: &Path) -> Result<usize> {
    let ctx = SessionContext::new();
    let df = ctx
        .read_parquet(
            path.to_str().context("Non UTF-8 path")?,
            ParquetReadOptions::default(),
        )
        .await?;
    Ok(df.count().await?)
}

#[test]
fn test_profile_writes_reports_and_succeeds_with_findings() -> Result<()> {
    let env = PremergeTestEnv::new()?;

    env.premerge()
        .arg("profile")
        .assert()
        .success()
        .stdout(predicate::str::contains("❌ primary_key.vehicles"))
        .stdout(predicate::str::contains("✅ primary_key.collisions"));

    for file in ["profile_report.md", "profile_report.json", "column_profiles.csv"] {
        assert!(env.root.join("reports").join(file).is_file(), "{file} missing");
    }

    let report = env.report()?;
    let checks = &report["checks"];
    assert_eq!(report["project"], "uk_road_safety_demo");
    assert_eq!(report["samples_included"], false);
    assert_eq!(report["summary"]["blocking_failures"], serde_json::json!([]));

    assert_eq!(checks["primary_key.collisions"]["status"], "pass");
    assert_eq!(checks["primary_key.collisions"]["blocking"], true);
    assert_eq!(checks["primary_key.vehicles"]["status"], "fail");
    assert_eq!(checks["primary_key.vehicles"]["outcome"]["duplicate_count"], 1);

    let fk = &checks["foreign_key.vehicles_to_collisions"]["outcome"];
    assert_eq!(fk["kind"], "foreign_key");
    assert_eq!(fk["total_rows"], 13);
    assert_eq!(fk["unmatched_count"], 1);
    // Without --emit-samples orphans keep their key and row index only
    assert_eq!(
        fk["unmatched_examples"],
        serde_json::json!([{ "key": "2018019999999", "row": { "row": 12 } }])
    );
    assert_eq!(checks["foreign_key.casualties_to_collisions"]["status"], "pass");

    assert_eq!(checks["domain.uk_latitude"]["outcome"]["violation_count"], 1);
    assert_eq!(checks["domain.legal_speed_limit"]["outcome"]["violation_count"], 1);
    assert_eq!(checks["domain.legal_speed_limit"]["outcome"]["missing_count"], 1);
    assert_eq!(checks["domain.driver_age"]["status"], "fail");
    assert_eq!(checks["domain.engine_capacity"]["status"], "pass");
    assert_eq!(checks["domain.casualty_age"]["status"], "pass");

    assert_eq!(
        report["years_present"]["collisions.collision_year"],
        serde_json::json!([2019, 2020, 2021, 2022, 2023])
    );
    assert_eq!(checks["parity.vehicle_count"]["outcome"]["mismatch_count"], 1);
    assert_eq!(checks["parity.casualty_count"]["status"], "pass");

    let columns = fs::read_to_string(env.root.join("reports/column_profiles.csv"))?;
    assert!(columns.lines().any(|l| l.starts_with("collisions,speed_limit,numeric,10,1,")));
    Ok(())
}

#[test]
fn test_emit_samples_includes_offending_rows() -> Result<()> {
    let env = PremergeTestEnv::new()?;

    env.premerge()
        .args(["profile", "--emit-samples"])
        .assert()
        .success();

    let report = env.report()?;
    assert_eq!(report["samples_included"], true);

    let unmatched = &report["checks"]["foreign_key.vehicles_to_collisions"]["outcome"]["unmatched_examples"][0];
    assert_eq!(unmatched["key"], "2018019999999");
    assert_eq!(unmatched["row"]["row"], 12);
    assert_eq!(unmatched["row"]["values"]["collision_index"], "2018019999999");

    let speed = &report["checks"]["domain.legal_speed_limit"]["outcome"]["sample_violations"][0];
    assert_eq!(speed["value"], "55");

    let md = fs::read_to_string(env.root.join("reports/profile_report.md"))?;
    assert!(md.contains("### foreign_key.vehicles_to_collisions"));
    assert!(md.contains("- row 12: key `2018019999999`"));
    Ok(())
}

#[test]
fn test_row_cap_is_reported() -> Result<()> {
    let env = PremergeTestEnv::new()?;

    env.premerge()
        .args(["profile", "--nrows", "3"])
        .assert()
        .success();

    let report = env.report()?;
    let tables = report["tables"].as_array().context("tables array")?;
    assert_eq!(tables.len(), 3);
    for table in tables {
        assert_eq!(table["row_count"], 3);
        assert_eq!(table["row_limit"], 3);
        assert_eq!(table["truncated"], true);
    }
    Ok(())
}

#[test]
fn test_profiling_twice_gives_identical_reports() -> Result<()> {
    let env = PremergeTestEnv::new()?;

    env.premerge().arg("profile").assert().success();
    let first = fs::read(env.root.join("reports/profile_report.json"))?;
    let first_md = fs::read(env.root.join("reports/profile_report.md"))?;

    env.premerge().arg("profile").assert().success();
    assert_eq!(first, fs::read(env.root.join("reports/profile_report.json"))?);
    assert_eq!(first_md, fs::read(env.root.join("reports/profile_report.md"))?);
    Ok(())
}

#[test]
fn test_missing_file_fails_without_writing_reports() -> Result<()> {
    let env = PremergeTestEnv::new()?;
    fs::remove_file(env.root.join(DATASET).join("Casualties.csv"))?;

    env.premerge()
        .arg("profile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("casualties"));

    assert!(!env.root.join("reports").exists());
    Ok(())
}

#[test]
fn test_missing_key_column_is_a_schema_error() -> Result<()> {
    let env = PremergeTestEnv::new()?;
    let path = env.root.join(DATASET).join("Vehicles.csv");
    let content = fs::read_to_string(&path)?.replacen("vehicle_reference", "veh_ref", 1);
    fs::write(&path, content)?;

    env.premerge()
        .arg("profile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("vehicle_reference"))
        .stderr(predicate::str::contains("Schema mismatch"));
    Ok(())
}

#[test]
fn test_defaults_apply_without_config_file() -> Result<()> {
    let env = PremergeTestEnv::new()?;
    fs::remove_file(env.root.join("premerge.yaml"))?;

    env.premerge().arg("profile").assert().success();

    let report = env.report()?;
    assert_eq!(report["project"], "uk_road_safety");
    assert_eq!(report["checks"]["domain.collision_year_range"]["status"], "pass");
    Ok(())
}

#[test]
fn test_data_dir_override() -> Result<()> {
    let env = PremergeTestEnv::new()?;
    let moved = env.root.join("elsewhere");
    fs::rename(env.root.join(DATASET), &moved)?;

    env.premerge().arg("profile").assert().failure();

    env.premerge()
        .arg("profile")
        .env("PREMERGE_DATA_DIR", &moved)
        .assert()
        .success()
        .stdout(predicate::str::contains("elsewhere"));
    Ok(())
}

#[tokio::test]
async fn test_merge_writes_enriched_parquet() -> Result<()> {
    let env = PremergeTestEnv::new()?;

    env.premerge().arg("profile").assert().success();
    env.premerge()
        .arg("merge")
        .assert()
        .success()
        .stdout(predicate::str::contains("vehicles: dropped 1 duplicate key-row(s)"));

    let processed = env.root.join("data/processed");
    assert_eq!(parquet_rows(&processed.join("collisions_clean.parquet")).await?, 9);
    assert_eq!(parquet_rows(&processed.join("vehicles_enriched.parquet")).await?, 12);
    assert_eq!(parquet_rows(&processed.join("casualties_enriched.parquet")).await?, 10);

    let ctx = SessionContext::new();
    let path = processed.join("casualties_enriched.parquet");
    let df = ctx
        .read_parquet(path.to_str().context("Non UTF-8 path")?, ParquetReadOptions::default())
        .await?;
    let fields: Vec<String> = df
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    for column in ["vehicle_type", "speed_limit", "latitude", "urban_or_rural_area"] {
        assert!(fields.iter().any(|f| f == column), "{column} not joined");
    }
    Ok(())
}

#[test]
fn test_merge_refuses_duplicate_root_keys() -> Result<()> {
    let env = PremergeTestEnv::new()?;
    env.append(
        "Collisions.csv",
        "2019010000001,2019,010000001,1,3,2,1,04/02/2019,51.5074,-0.1278,30,1,1,1",
    )?;

    env.premerge().arg("profile").assert().success();
    let report = env.report()?;
    assert_eq!(
        report["summary"]["blocking_failures"],
        serde_json::json!(["primary_key.collisions"])
    );

    env.premerge()
        .arg("merge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Merge blocked"));
    assert!(!env.root.join("data/processed").exists());

    // Forcing past the gate still cannot join on an ambiguous key
    env.premerge()
        .args(["merge", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ambiguous join"));
    Ok(())
}

use predicates::{prelude::PredicateBooleanExt, str};
use std::{fs, path::Path};
use test_utilities::*;

#[test]
fn builds_and_probes() {
	let (dir, image) = fixture_map();
	let output = dir.path().join("katoomba.mbtiles");

	tilepress_cmd()
		.args(["build", path_str(&output), "-i", path_str(&image), "-z", "12", "-j", "2"])
		.assert()
		.success()
		.stdout(str::contains("tiles, zoom").and(str::contains("-12, bounds 150.")));

	let report = probe(&output);
	for line in [
		"metadata:\n",
		"  name: katoomba\n",
		"  type: baselayer\n",
		"  version: 1.1\n",
		"  description: katoomba\n",
		"  format: png\n",
		"  maxzoom: 12\n",
		"  zoom 12: ",
	] {
		assert!(report.contains(line), "missing {line:?} in\n{report}");
	}
	assert!(!dir.path().join("katoomba.mbtiles.partial").exists());
}

#[test]
fn rebuild_is_identical() {
	let (dir, image) = fixture_map();
	let first = dir.path().join("first.mbtiles");
	let second = dir.path().join("second.mbtiles");

	for output in [&first, &second] {
		tilepress_cmd()
			.args(["build", path_str(output), "-i", path_str(&image), "-z", "11", "--compress", "none"])
			.assert()
			.success();
	}

	let stable = |path: &Path| -> Vec<String> {
		let report = tilepress_cmd()
			.args(["probe", "--tiles", path_str(path)])
			.assert()
			.success()
			.get_output()
			.stdout
			.clone();
		String::from_utf8(report)
			.unwrap()
			.lines()
			.filter(|line| !line.contains("name:") && !line.contains("description:"))
			.map(String::from)
			.collect()
	};
	assert_eq!(stable(&first), stable(&second));
}

#[test]
fn invalid_zoom_fails_before_work() {
	let (dir, image) = fixture_map();
	let output = dir.path().join("out.mbtiles");

	tilepress_cmd()
		.args(["build", path_str(&output), "-i", path_str(&image), "-z", "5"])
		.assert()
		.failure()
		.code(1)
		.stderr(str::contains("invalid zoom outside 10-19 range: 5"));
	assert!(!output.exists());
}

#[test]
fn zoom_outside_a_byte_is_an_invalid_zoom() {
	let (dir, image) = fixture_map();
	let output = dir.path().join("out.mbtiles");

	for zoom in ["300", "-1"] {
		tilepress_cmd()
			.args(["build", path_str(&output), "-i", path_str(&image), "-z", zoom])
			.assert()
			.failure()
			.code(1)
			.stderr(str::contains(format!("invalid zoom outside 10-19 range: {zoom}")));
	}
	assert!(!output.exists());
}

#[test]
fn canvas_over_budget_fails_before_work() {
	let (dir, image) = fixture_map();
	let output = dir.path().join("out.mbtiles");

	tilepress_cmd()
		.args(["build", path_str(&output), "-i", path_str(&image), "-z", "14", "--pixel-budget", "65536"])
		.assert()
		.failure()
		.code(1)
		.stderr(str::contains("canvas of zoom level 14 is").and(str::contains("more than the budget of 65536")));
	assert!(!output.exists());
}

#[test]
fn builds_from_config_file() {
	let (dir, _image) = fixture_map();
	let config = dir.path().join("build.yml");
	fs::write(
		&config,
		"name: blue-mountains\ndescription: Blue Mountains test sheet\nmax_zoom: 11\nsource:\n  image: sheet.png\ncompression:\n  engine: none\n",
	)
	.unwrap();
	let output = dir.path().join("out.mbtiles");

	tilepress_cmd()
		.args(["build", path_str(&output), "-c", path_str(&config)])
		.assert()
		.success();

	let report = probe(&output);
	assert!(report.contains("  name: blue-mountains\n"));
	assert!(report.contains("  description: Blue Mountains test sheet\n"));
	assert!(report.contains("  maxzoom: 11\n"));
}

#[test]
fn unknown_config_key_is_rejected() {
	let (dir, _image) = fixture_map();
	let config = dir.path().join("build.yml");
	fs::write(&config, "max_zom: 11\n").unwrap();

	tilepress_cmd()
		.args(["build", path_str(&dir.path().join("out.mbtiles")), "-c", path_str(&config)])
		.assert()
		.failure()
		.stderr(str::contains("unknown field `max_zom`"));
}

#[test]
fn missing_world_file_is_reported() {
	let (dir, image) = fixture_map();
	fs::remove_file(dir.path().join("sheet.pgw")).unwrap();

	tilepress_cmd()
		.args(["build", path_str(&dir.path().join("out.mbtiles")), "-i", path_str(&image)])
		.assert()
		.failure()
		.stderr(str::contains("no world file found"));
}

#[cfg(unix)]
#[test]
fn failed_build_keeps_existing_output() {
	let (dir, image) = fixture_map();
	let output = dir.path().join("out.mbtiles");
	fs::write(&output, "previous build").unwrap();

	tilepress_cmd()
		.args([
			"build",
			path_str(&output),
			"-i",
			path_str(&image),
			"-z",
			"11",
			"--compress",
			"command",
			"--compressor",
			"false",
		])
		.assert()
		.failure()
		.stderr(str::contains("compression failed"));

	assert_eq!(fs::read_to_string(&output).unwrap(), "previous build");
	assert!(!dir.path().join("out.mbtiles.partial").exists());
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::tempdir;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cosmo"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const LOG_PARAM: &str = "\
data.parameters['omega_b']  = [2.2, None, None, 0.01, 1, 'cosmo']
data.parameters['n_s']      = [0.96, 0.8, 1.2, 0.004, 1, 'cosmo']
data.parameters['A_planck'] = [1.0, 0.9, 1.1, 0, 1, 'nuisance']
data.parameters['H0']       = [0, None, None, 0, 1, 'derived']
data.cosmo_arguments['output'] = 'tCl'
";

fn chain_folder(root: &Path) -> PathBuf {
    let folder = root.join("lcdm");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("log.param"), LOG_PARAM).unwrap();
    fs::write(
        folder.join("run__1.txt"),
        "1 5.0 2.20 0.960 67.0\n2 1.0 2.25 0.970 68.0\n1 3.0 2.10 0.955 66.5\n",
    )
    .unwrap();
    folder
}

#[test]
fn info_lists_parameters() {
    let root = tempdir().unwrap();
    let folder = chain_folder(root.path());
    let out = stdout(&run(&["info", "--folder", folder.to_str().unwrap()]));
    assert!(out.contains("chain   lcdm"));
    assert!(out.contains("rows    3"));
    assert!(out.contains("varying-cosmological"));
    assert!(out.contains("derived"));
}

#[test]
fn best_fit_prints_lowest_mloglik_first() {
    let root = tempdir().unwrap();
    let folder = chain_folder(root.path());
    let out = stdout(&run(&[
        "best-fit",
        "--folder",
        folder.to_str().unwrap(),
        "-k",
        "2",
        "--params",
        "n_s",
    ]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, ["mloglik\tn_s", "1\t0.97", "3\t0.955"]);
}

#[test]
fn correlation_subset_has_unit_diagonal() {
    let root = tempdir().unwrap();
    let folder = chain_folder(root.path());
    let target = root.path().join("corr.txt");
    stdout(&run(&[
        "correlation",
        "--folder",
        folder.to_str().unwrap(),
        "--params",
        "H0,n_s",
        "--out",
        target.to_str().unwrap(),
    ]));
    let text = fs::read_to_string(target).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "# H0 n_s");
    assert!(lines[1].starts_with("1.000000e0 "));
    assert!(lines[2].ends_with(" 1.000000e0"));
}

#[test]
fn export_writes_inputs_and_nuisance() {
    let root = tempdir().unwrap();
    let folder = chain_folder(root.path());
    let out_dir = root.path().join("export");
    stdout(&run(&[
        "export",
        "--folder",
        folder.to_str().unwrap(),
        "--set",
        "lensing=yes",
        "--out",
        out_dir.to_str().unwrap(),
    ]));
    let inputs: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("spectrum_inputs.json")).unwrap())
            .unwrap();
    assert_eq!(inputs["output"], "tCl");
    assert_eq!(inputs["n_s"], 0.97);
    assert_eq!(inputs["lensing"], "yes");
    let nuisance = fs::read_to_string(out_dir.join("nuisance.txt")).unwrap();
    assert_eq!(nuisance, "A_planck=1\n");
}

#[test]
fn summarize_writes_one_file_per_chain() {
    let root = tempdir().unwrap();
    let folder = chain_folder(root.path());
    let out_dir = root.path().join("summaries");
    stdout(&run(&[
        "summarize",
        "--folders",
        folder.to_str().unwrap(),
        "--out",
        out_dir.to_str().unwrap(),
    ]));
    assert!(out_dir.join("lcdm.json").is_file());
    let index: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("index.json")).unwrap()).unwrap();
    assert_eq!(index[0]["rows"], 3);
}

#[test]
fn unknown_parameter_fails() {
    let root = tempdir().unwrap();
    let folder = chain_folder(root.path());
    let output = run(&[
        "best-fit",
        "--folder",
        folder.to_str().unwrap(),
        "--params",
        "sigma8",
    ]);
    assert!(!output.status.success());
}

#[test]
fn summarize_rejects_chains_sharing_a_name() {
    let root = tempdir().unwrap();
    let first = chain_folder(&root.path().join("run1"));
    let second = chain_folder(&root.path().join("run2"));
    let out_dir = root.path().join("summaries");
    let output = run(&[
        "summarize",
        "--folders",
        first.to_str().unwrap(),
        second.to_str().unwrap(),
        "--out",
        out_dir.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("lcdm"));
    assert!(!out_dir.join("lcdm.json").exists());
}

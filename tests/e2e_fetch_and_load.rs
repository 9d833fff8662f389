//! End-to-end fetch and load tests against real directories on disk.
//!
//! Hub and URL tests require network access.
//! Set PRETRAINER_NETWORK_TESTS to run them.

use std::any::Any;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use pretrainer::{
    shared, DefaultFetcher, Device, FetchError, FetchOptions, LoadError, Loadable, Pretrainer,
    Source, Transferable,
};

/// Check if network-dependent tests are enabled.
fn network_tests_enabled() -> bool {
    std::env::var("PRETRAINER_NETWORK_TESTS").is_ok()
}

/// Skip test if network tests are not enabled.
macro_rules! require_network {
    () => {
        if !network_tests_enabled() {
            eprintln!("SKIPPED: PRETRAINER_NETWORK_TESTS not set. Set it to run network tests.");
            return;
        }
    };
}

#[derive(serde::Deserialize)]
struct LinearParams {
    weights: Vec<f64>,
    bias: f64,
}

/// Linear model whose parameters live in a JSON file.
#[derive(Default)]
struct LinearModel {
    weights: Vec<f64>,
    bias: f64,
}

impl Loadable for LinearModel {
    fn as_transferable(&mut self) -> Option<&mut dyn Transferable> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Transferable for LinearModel {
    fn transfer_from(&mut self, path: &Path, _device: Option<&Device>) -> Result<(), LoadError> {
        let content = fs::read_to_string(path)?;
        let params: LinearParams =
            serde_json::from_str(&content).map_err(|e| LoadError::MalformedFile(e.to_string()))?;
        self.weights = params.weights;
        self.bias = params.bias;
        Ok(())
    }
}

/// Vocabulary holder with no capability interfaces of its own.
#[derive(Default)]
struct Tokenizer {
    vocab: Vec<String>,
}

impl Loadable for Tokenizer {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Write a linear model parameter file under `dir`.
fn write_params(dir: &Path, name: &str, weights: &[f64], bias: f64) {
    let body = serde_json::json!({ "weights": weights, "bias": bias });
    fs::write(dir.join(format!("{name}.ckpt")), body.to_string()).unwrap();
}

/// Test fetching from a local directory and loading via parameter transfer.
#[test]
fn test_fetch_and_load_from_local_directory() {
    let source_dir = tempfile::tempdir().unwrap();
    let save_dir = tempfile::tempdir().unwrap();
    write_params(source_dir.path(), "model", &[0.5, -1.25], 0.1);

    let mut pretrainer = Pretrainer::new(save_dir.path()).unwrap();
    let model = shared(LinearModel::default());
    pretrainer.add_loadable("model", Arc::clone(&model));

    pretrainer
        .fetch_and_load(&Source::local(source_dir.path()), None)
        .unwrap();

    let mut guard = model.lock().unwrap();
    let linear = guard.as_any_mut().downcast_mut::<LinearModel>().unwrap();
    assert_eq!(linear.weights, [0.5, -1.25]);
    assert_eq!(linear.bias, 0.1);

    assert!(save_dir.path().join("model.ckpt").exists());
}

/// Test that a file already in the save directory is reused as-is.
#[test]
fn test_existing_paramfile_is_reused() {
    let source_dir = tempfile::tempdir().unwrap();
    let save_dir = tempfile::tempdir().unwrap();
    write_params(source_dir.path(), "model", &[1.0], 0.0);
    write_params(save_dir.path(), "model", &[9.0], 9.0);

    let mut pretrainer = Pretrainer::new(save_dir.path()).unwrap();
    let model = shared(LinearModel::default());
    pretrainer.add_loadable("model", Arc::clone(&model));

    pretrainer
        .fetch_and_load(&Source::local(source_dir.path()), None)
        .unwrap();

    let mut guard = model.lock().unwrap();
    let linear = guard.as_any_mut().downcast_mut::<LinearModel>().unwrap();
    assert_eq!(linear.weights, [9.0]);
    assert_eq!(linear.bias, 9.0);
}

/// Test that the overwrite option replaces a stale save-directory copy.
#[test]
fn test_overwrite_refetches_paramfile() {
    let source_dir = tempfile::tempdir().unwrap();
    let save_dir = tempfile::tempdir().unwrap();
    write_params(source_dir.path(), "model", &[1.0], 0.5);
    write_params(save_dir.path(), "model", &[9.0], 9.0);

    let fetcher = DefaultFetcher::with_options(FetchOptions {
        overwrite: true,
        ..Default::default()
    })
    .unwrap();
    let mut pretrainer = Pretrainer::with_fetcher(save_dir.path(), Box::new(fetcher));
    let model = shared(LinearModel::default());
    pretrainer.add_loadable("model", Arc::clone(&model));

    pretrainer
        .fetch_and_load(&Source::local(source_dir.path()), None)
        .unwrap();

    let mut guard = model.lock().unwrap();
    let linear = guard.as_any_mut().downcast_mut::<LinearModel>().unwrap();
    assert_eq!(linear.weights, [1.0]);
    assert_eq!(linear.bias, 0.5);
}

/// Test that a failed refetch leaves the existing save-directory copy intact.
#[test]
fn test_failed_refetch_keeps_existing_copy() {
    let source_dir = tempfile::tempdir().unwrap();
    let save_dir = tempfile::tempdir().unwrap();
    write_params(save_dir.path(), "model", &[3.0], 0.25);

    let fetcher = DefaultFetcher::with_options(FetchOptions {
        overwrite: true,
        ..Default::default()
    })
    .unwrap();
    let mut pretrainer = Pretrainer::with_fetcher(save_dir.path(), Box::new(fetcher));
    pretrainer.add_loadable("model", shared(LinearModel::default()));

    // the source has no model.ckpt, so the refetch fails
    let result = pretrainer.fetch_and_load(&Source::local(source_dir.path()), None);
    assert!(matches!(
        result,
        Err(pretrainer::Error::Fetch(FetchError::LocalFileMissing(_)))
    ));

    let kept: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(save_dir.path().join("model.ckpt")).unwrap())
            .unwrap();
    assert_eq!(kept["weights"][0], 3.0);
    assert_eq!(kept["bias"], 0.25);
}

/// Test that a missing file in a local source is reported, not skipped.
#[test]
fn test_missing_local_paramfile_fails() {
    let source_dir = tempfile::tempdir().unwrap();
    let save_dir = tempfile::tempdir().unwrap();

    let mut pretrainer = Pretrainer::new(save_dir.path()).unwrap();
    pretrainer.add_loadable("absent", shared(LinearModel::default()));

    let result = pretrainer.fetch_parameters(&Source::local(source_dir.path()));
    assert!(matches!(
        result,
        Err(pretrainer::Error::Fetch(FetchError::LocalFileMissing(_)))
    ));
}

/// Test that local fetches land as symlinks under the save directory.
#[cfg(unix)]
#[test]
fn test_local_fetch_symlinks_into_save_dir() {
    let source_dir = tempfile::tempdir().unwrap();
    let save_dir = tempfile::tempdir().unwrap();
    write_params(source_dir.path(), "model", &[2.0], 1.0);

    let mut pretrainer = Pretrainer::new(save_dir.path()).unwrap();
    pretrainer.add_loadable("model", shared(LinearModel::default()));

    let paramfiles = pretrainer
        .fetch_parameters(&Source::local(source_dir.path()))
        .unwrap();

    let fetched = &paramfiles["model"];
    assert_eq!(fetched, &save_dir.path().join("model.ckpt"));
    let meta = fs::symlink_metadata(fetched).unwrap();
    assert!(meta.file_type().is_symlink());
}

/// Test that a custom hook can reach the concrete type behind a loadable.
#[test]
fn test_custom_hook_can_reach_concrete_type() {
    let source_dir = tempfile::tempdir().unwrap();
    let save_dir = tempfile::tempdir().unwrap();
    fs::write(source_dir.path().join("tokenizer.ckpt"), b"a b c").unwrap();

    let mut pretrainer = Pretrainer::new(save_dir.path()).unwrap();
    let tokenizer = shared(Tokenizer::default());
    pretrainer.add_loadable("tokenizer", Arc::clone(&tokenizer));
    pretrainer.add_custom_hook("tokenizer", |loadable, path, _device| {
        let tokenizer = loadable
            .as_any_mut()
            .downcast_mut::<Tokenizer>()
            .ok_or_else(|| LoadError::MalformedFile("expected a Tokenizer".into()))?;
        let content = fs::read_to_string(path)?;
        tokenizer.vocab = content.split_whitespace().map(str::to_string).collect();
        Ok(())
    });

    pretrainer
        .fetch_and_load(&Source::local(source_dir.path()), None)
        .unwrap();

    let mut guard = tokenizer.lock().unwrap();
    let tokenizer = guard.as_any_mut().downcast_mut::<Tokenizer>().unwrap();
    assert_eq!(tokenizer.vocab, ["a", "b", "c"]);
}

/// Fetch a real tokenizer checkpoint from the Hub.
#[test]
fn test_fetch_parameters_from_hub() {
    require_network!();

    let save_dir = tempfile::tempdir().unwrap();
    let mut pretrainer = Pretrainer::new(save_dir.path()).unwrap();
    pretrainer.add_loadable("tokenizer", shared(Tokenizer::default()));

    let paramfiles = pretrainer
        .fetch_parameters(&Source::hugging_face(
            "speechbrain/asr-crdnn-rnnlm-librispeech",
        ))
        .unwrap();

    let fetched = &paramfiles["tokenizer"];
    assert!(fetched.exists());
    assert!(fs::metadata(fetched).unwrap().len() > 0);
}

/// Download a parameter file over plain HTTPS.
#[test]
fn test_fetch_parameters_from_url() {
    require_network!();

    let save_dir = tempfile::tempdir().unwrap();
    let mut pretrainer = Pretrainer::new(save_dir.path()).unwrap();
    pretrainer.add_loadable("tokenizer", shared(Tokenizer::default()));

    let source = Source::url(
        "https://huggingface.co/speechbrain/asr-crdnn-rnnlm-librispeech/resolve/main",
    );
    let paramfiles = pretrainer.fetch_parameters(&source).unwrap();

    let fetched = &paramfiles["tokenizer"];
    assert!(fetched.is_file());
    assert!(fs::metadata(fetched).unwrap().len() > 0);
}

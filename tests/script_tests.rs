#![cfg(unix)]

mod common;

use std::time::Duration;

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::ContentTree;
use simlab::{
    config::{Config, EngineConfig},
    execution::{engine::open_figures, ScriptLoader},
    plot::{canvas::BLUE, Canvas},
    process::Interpreter,
    ContentReference, Engine, FailureKind, Locator, NativeLoader,
};

fn shell_engine(tree: &ContentTree) -> Engine {
    let locator = Locator::new(tree.projects(), tree.blog()).with_extensions(["sh"]);
    Engine::new(locator, ScriptLoader::new().with_interpreter("sh", Interpreter::shell("sh")))
}

fn dot_png() -> Result<Vec<u8>> {
    let mut canvas = Canvas::new(40, 40);
    canvas.point(20, 20, 5, BLUE);
    Ok(canvas.rasterize(100)?)
}

#[tokio::test]
async fn script_output_and_staged_figure_are_captured() -> Result<()> {
    let tree = ContentTree::new()?;
    let png = dot_png()?;
    tree.project_file("dot", "dot.png", &png)?;
    tree.project_file(
        "dot",
        "dot_sim.sh",
        "echo hello\ncp dot.png \"$SIMLAB_FIGURE_DIR/figure_000.png\"\n",
    )?;

    let outcome = shell_engine(&tree).run(&ContentReference::project("dot")).await;
    assert!(outcome.is_success(), "{:?}", outcome.error());
    assert_eq!(outcome.captured_text(), "hello\n");
    assert_eq!(outcome.artifacts().len(), 1);
    assert_eq!(outcome.artifacts()[0].payload, STANDARD.encode(&png));
    assert_eq!(open_figures().await, 0);
    Ok(())
}

#[tokio::test]
async fn failing_script_keeps_text_and_drops_figures() -> Result<()> {
    let tree = ContentTree::new()?;
    tree.project_file("dot", "dot.png", dot_png()?)?;
    tree.project_file(
        "dot",
        "crash_sim.sh",
        "echo step1\ncp dot.png \"$SIMLAB_FIGURE_DIR/figure_000.png\"\necho 'division by zero' >&2\nexit 1\necho never\n",
    )?;

    let outcome = shell_engine(&tree).run(&ContentReference::project("dot")).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::RuntimeFailure));
    assert_eq!(outcome.captured_text(), "step1\n");
    assert_eq!(outcome.error(), Some("division by zero"));
    assert!(outcome.artifacts().is_empty());
    assert_eq!(open_figures().await, 0);
    Ok(())
}

#[tokio::test]
async fn silent_non_zero_exit_reports_status() -> Result<()> {
    let tree = ContentTree::new()?;
    tree.project_file("quiet", "quiet_sim.sh", "exit 7\n")?;
    let outcome = shell_engine(&tree).run(&ContentReference::project("quiet")).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::RuntimeFailure));
    assert_eq!(outcome.error(), Some("simulation exited with status 7"));
    Ok(())
}

#[tokio::test]
async fn syntax_error_is_a_load_failure() -> Result<()> {
    let tree = ContentTree::new()?;
    tree.project_file("broken", "broken_sim.sh", "echo before\nif then fi (\n")?;
    let outcome = shell_engine(&tree).run(&ContentReference::project("broken")).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::LoadFailure));
    assert!(!outcome.error().unwrap_or_default().is_empty());
    // nothing ran
    assert_eq!(outcome.captured_text(), "");
    Ok(())
}

#[tokio::test]
async fn missing_interpreter_is_a_load_failure() -> Result<()> {
    let tree = ContentTree::new()?;
    tree.project_file("x", "x_sim.sh", "echo hi\n")?;
    let locator = Locator::new(tree.projects(), tree.blog()).with_extensions(["sh"]);
    let loader = ScriptLoader::new()
        .with_interpreter("sh", Interpreter::shell("/nonexistent/simlab-shell"));
    let outcome = Engine::new(locator, loader).run(&ContentReference::project("x")).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::LoadFailure));
    assert!(outcome.error().unwrap_or_default().contains("cannot start"));
    Ok(())
}

#[tokio::test]
async fn non_png_staged_file_is_skipped() -> Result<()> {
    let tree = ContentTree::new()?;
    tree.project_file("mix", "dot.png", dot_png()?)?;
    tree.project_file(
        "mix",
        "mix_sim.sh",
        "echo junk > \"$SIMLAB_FIGURE_DIR/figure_000.png\"\ncp dot.png \"$SIMLAB_FIGURE_DIR/figure_001.png\"\n",
    )?;
    let outcome = shell_engine(&tree).run(&ContentReference::project("mix")).await;
    assert!(outcome.is_success());
    let ordinals: Vec<usize> = outcome.artifacts().iter().map(|a| a.ordinal).collect();
    assert_eq!(ordinals, vec![1]);
    Ok(())
}

#[tokio::test]
async fn long_script_is_killed_at_the_deadline() -> Result<()> {
    let tree = ContentTree::new()?;
    tree.project_file("slow", "slow_sim.sh", "echo started\nexec sleep 30\n")?;
    let engine = shell_engine(&tree).with_timeout(Some(Duration::from_millis(500)));

    let started = std::time::Instant::now();
    let outcome = engine.run(&ContentReference::project("slow")).await;
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(outcome.failure_kind(), Some(FailureKind::TimedOut));
    assert_eq!(outcome.captured_text(), "started\n");
    assert_eq!(outcome.status_code(), 500);
    Ok(())
}

#[tokio::test]
async fn output_written_before_the_kill_is_drained() -> Result<()> {
    let tree = ContentTree::new()?;
    tree.project_file("flood", "flood_sim.sh", "i=0\nwhile :; do echo \"line $i\"; i=$((i+1)); done\n")?;
    let engine = shell_engine(&tree).with_timeout(Some(Duration::from_millis(300)));

    let outcome = engine.run(&ContentReference::project("flood")).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::TimedOut));
    let text = outcome.captured_text();
    assert!(text.starts_with("line 0\n"));
    assert!(text.ends_with('\n'), "cut off mid-line: {:?}", text.lines().last());
    assert!(text.lines().all(|l| l.starts_with("line ")));
    Ok(())
}

#[tokio::test]
async fn engine_from_config_runs_shell_units() -> Result<()> {
    let tree = ContentTree::new()?;
    tree.post_file("note", "note_sim.sh", "printf 'from blog'\n")?;
    let cfg = Config::from_pairs([
        ("SIMLAB_PROJECTS_DIR", tree.projects().to_string_lossy().into_owned()),
        ("SIMLAB_BLOG_DIR", tree.blog().to_string_lossy().into_owned()),
        ("SIMLAB_UNIT_EXTENSIONS", "py,sh".to_string()),
    ]);
    let engine = Engine::from_config(&EngineConfig::from_config(&cfg), NativeLoader::new());
    let outcome = engine.run(&ContentReference::post("note")).await;
    assert!(outcome.is_success(), "{:?}", outcome.error());
    assert_eq!(outcome.captured_text(), "from blog");
    Ok(())
}

fn has_python(module: Option<&str>) -> bool {
    let mut cmd = std::process::Command::new("python3");
    match module {
        Some(m) => cmd.arg("-c").arg(format!("import {}", m)),
        None => cmd.arg("--version"),
    };
    cmd.output().is_ok_and(|o| o.status.success())
}

fn python_engine(tree: &ContentTree) -> Engine {
    let locator = Locator::new(tree.projects(), tree.blog()).with_extensions(["py"]);
    Engine::new(locator, ScriptLoader::new().with_interpreter("py", Interpreter::python("python3")))
}

#[tokio::test]
async fn python_unit_prints_and_succeeds() -> Result<()> {
    if !has_python(None) {
        eprintln!("python3 not installed; skipping");
        return Ok(());
    }
    let tree = ContentTree::new()?;
    tree.project_file("hello", "hello_sim.py", "print('hello')\n")?;
    let outcome = python_engine(&tree).run(&ContentReference::project("hello")).await;
    assert!(outcome.is_success(), "{:?}", outcome.error());
    assert_eq!(outcome.captured_text(), "hello\n");
    assert!(outcome.artifacts().is_empty());
    Ok(())
}

#[tokio::test]
async fn python_exception_keeps_partial_text() -> Result<()> {
    if !has_python(None) {
        eprintln!("python3 not installed; skipping");
        return Ok(());
    }
    let tree = ContentTree::new()?;
    tree.project_file("crash", "crash_sim.py", "print('partial')\nratio = 1 / 0\nprint('never')\n")?;
    let outcome = python_engine(&tree).run(&ContentReference::project("crash")).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::RuntimeFailure));
    assert_eq!(outcome.captured_text(), "partial\n");
    assert_eq!(outcome.error(), Some("division by zero"));
    assert!(outcome.artifacts().is_empty());
    assert_eq!(outcome.status_code(), 500);
    Ok(())
}

#[tokio::test]
async fn python_syntax_error_is_a_load_failure() -> Result<()> {
    if !has_python(None) {
        eprintln!("python3 not installed; skipping");
        return Ok(());
    }
    let tree = ContentTree::new()?;
    tree.project_file("broken", "broken_sim.py", "print('before')\nprint((\n")?;
    let outcome = python_engine(&tree).run(&ContentReference::project("broken")).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::LoadFailure));
    assert!(outcome.error().unwrap_or_default().starts_with("SyntaxError"), "{:?}", outcome.error());
    assert_eq!(outcome.captured_text(), "");
    Ok(())
}

#[tokio::test]
async fn python_exit_status_three_is_a_runtime_failure() -> Result<()> {
    if !has_python(None) {
        eprintln!("python3 not installed; skipping");
        return Ok(());
    }
    let tree = ContentTree::new()?;
    tree.project_file("quits", "quits_sim.py", "import sys\nprint('ran')\nsys.exit(3)\n")?;
    let outcome = python_engine(&tree).run(&ContentReference::project("quits")).await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::RuntimeFailure));
    assert_eq!(outcome.captured_text(), "ran\n");
    assert_eq!(outcome.error(), Some("simulation exited with status 3"));
    Ok(())
}

#[tokio::test]
async fn python_figures_are_staged_in_creation_order() -> Result<()> {
    if !has_python(Some("matplotlib")) {
        eprintln!("matplotlib not installed; skipping");
        return Ok(());
    }
    let tree = ContentTree::new()?;
    tree.project_file(
        "waves",
        "waves_sim.py",
        "import matplotlib.pyplot as plt\n\
         plt.figure()\nplt.plot([0, 1, 2], [0, 1, 0])\n\
         plt.figure()\nplt.plot([0, 1, 2], [1, 0, 1])\n\
         print('plotted')\n",
    )?;
    let outcome = python_engine(&tree).run(&ContentReference::project("waves")).await;
    assert!(outcome.is_success(), "{:?}", outcome.error());
    assert_eq!(outcome.captured_text(), "plotted\n");
    let ordinals: Vec<usize> = outcome.artifacts().iter().map(|a| a.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1]);
    for artifact in outcome.artifacts() {
        let png = STANDARD.decode(&artifact.payload)?;
        assert!(simlab::plot::canvas::png_dimensions(&png).is_some());
    }
    assert_eq!(open_figures().await, 0);
    Ok(())
}

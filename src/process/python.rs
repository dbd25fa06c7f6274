//! Python bootstrap: headless plotting, load/run split, figure staging.

use std::path::Path;

use tokio::process::Command;

/// Prefix of the stderr line carrying a runtime exception message.
pub const ERROR_MARKER: &str = "__simlab_error__: ";

/// Prefix of the stderr line written when the script does not compile.
/// Only the bootstrap's compile step writes it.
pub const LOAD_ERROR_MARKER: &str = "__simlab_load_error__: ";

pub const BOOTSTRAP: &str = r#"
import atexit, os, sys

ERROR_MARKER = "__simlab_error__: "
LOAD_ERROR_MARKER = "__simlab_load_error__: "
_figure_dir = os.environ["SIMLAB_FIGURE_DIR"]
_dpi = int(os.environ.get("SIMLAB_FIGURE_DPI", "100"))

try:
    import matplotlib
    matplotlib.use("Agg")
except ImportError:
    matplotlib = None


def _flush_figures():
    if matplotlib is None or "matplotlib.pyplot" not in sys.modules:
        return
    import matplotlib.pyplot as plt
    for ordinal, number in enumerate(plt.get_fignums()):
        path = os.path.join(_figure_dir, "figure_%03d.png" % ordinal)
        try:
            plt.figure(number).savefig(path, format="png", bbox_inches="tight", dpi=_dpi)
        except Exception as exc:
            sys.stderr.write("figure %d not saved: %s\n" % (ordinal, exc))
    plt.close("all")


atexit.register(_flush_figures)

_path = sys.argv[1]
sys.argv = sys.argv[1:]
sys.path.insert(0, os.path.dirname(_path))

try:
    with open(_path, "rb") as _fh:
        _code = compile(_fh.read(), _path, "exec")
except (SyntaxError, ValueError, OSError) as exc:
    sys.stderr.write("%s%s: %s\n" % (LOAD_ERROR_MARKER, type(exc).__name__, exc))
    sys.exit(3)

try:
    exec(_code, {"__name__": "__main__", "__file__": _path})
except SystemExit:
    raise
except BaseException as exc:
    import traceback
    traceback.print_exc()
    sys.stderr.write("%s%s\n" % (ERROR_MARKER, str(exc) or type(exc).__name__))
    sys.exit(1)
"#;

pub fn command(program: &str, script: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.arg("-u") // unbuffered
        .arg("-c")
        .arg(BOOTSTRAP)
        .arg(script);
    cmd
}

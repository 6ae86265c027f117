use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;
use xtemplate::DEFAULT_NAMESPACE;
use xtemplate::cli::{Cli, CliError, execute};

/// A scratch directory holding templates and data files for one test.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> std::io::Result<Self> {
        super::init_logging();
        Ok(Workspace {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Writes `body` wrapped in an `<xt:template>` root that also declares `fn`.
    pub fn write_template(&self, name: &str, body: &str) -> std::io::Result<PathBuf> {
        self.write(
            name,
            &format!(
                r#"<xt:template xmlns:xt="{}" xmlns:fn="http://java.sun.com/jsp/jstl/functions">{}</xt:template>"#,
                DEFAULT_NAMESPACE, body
            ),
        )
    }

    pub fn base(&self) -> Url {
        Url::from_directory_path(self.dir.path()).expect("temp dir is absolute")
    }

    /// Parses `args` as a command line and runs it with `--out out.xml`
    /// relative to this workspace, returning the output text.
    pub fn run(&self, args: &[&str]) -> Result<String, CliError> {
        let out = self.dir.path().join("out.xml");
        let mut argv = vec!["xtemplate", "--out", out.to_str().expect("utf-8 path")];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("valid command line");
        execute(&cli, &self.base())?;
        Ok(fs::read_to_string(out)?)
    }
}

//! The collaborators the runtime reaches the outside world through: a
//! console for `print`/`input` and a workspace for imports and files.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    rc::Rc,
};

use log::debug;

pub const SOURCE_EXTENSION: &str = "bp";

pub trait Console {
    fn print(&mut self, text: &str);
    fn input(&mut self, prompt: &str) -> io::Result<String>;
    fn clear(&mut self);
}

#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    fn input(&mut self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;
        let mut line = String::default();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn clear(&mut self) {
        print!("\x1B[2J\x1B[1;1H");
        // Nothing sensible to do if the terminal is gone
        let _ = io::stdout().flush();
    }
}

/// Records printed lines and replays queued input. Clones share the same
/// buffers, so a handle kept outside the interpreter can inspect output.
#[derive(Clone, Debug, Default)]
pub struct CapturedConsole {
    output: Rc<RefCell<Vec<String>>>,
    input: Rc<RefCell<VecDeque<String>>>,
}

impl CapturedConsole {
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let console = Self::default();
        console
            .input
            .borrow_mut()
            .extend(lines.into_iter().map(Into::into));
        console
    }

    pub fn lines(&self) -> Vec<String> {
        self.output.borrow().clone()
    }
}

impl Console for CapturedConsole {
    fn print(&mut self, text: &str) {
        self.output.borrow_mut().push(text.to_string());
    }

    fn input(&mut self, prompt: &str) -> io::Result<String> {
        if !prompt.is_empty() {
            self.output.borrow_mut().push(prompt.to_string());
        }
        Ok(self.input.borrow_mut().pop_front().unwrap_or_default())
    }

    fn clear(&mut self) {
        self.output.borrow_mut().clear();
    }
}

pub trait Workspace {
    /// Where `import "lib"` looks: names carrying the source extension are
    /// relative to the workspace, anything else is a library name.
    fn resolve_lib(&self, lib: &str) -> PathBuf;
    /// Where the file built-ins look. Relative paths, `./` ones included,
    /// are taken from the workspace directory.
    fn resolve_file(&self, path: &str) -> PathBuf;
    fn read(&self, path: &Path) -> io::Result<String>;
    fn write(&self, path: &Path, text: &str) -> io::Result<()>;
    fn delete(&self, path: &Path) -> io::Result<()>;
}

fn resolve_lib(root: &Path, lib_dir: &Path, lib: &str) -> PathBuf {
    let is_script = Path::new(lib)
        .extension()
        .is_some_and(|ext| ext == SOURCE_EXTENSION);
    if is_script {
        root.join(lib.trim_start_matches("./"))
    } else {
        lib_dir.join(format!("{lib}.{SOURCE_EXTENSION}"))
    }
}

fn resolve_file(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path.strip_prefix("./").unwrap_or(path))
    }
}

#[derive(Clone, Debug)]
pub struct FsWorkspace {
    root: PathBuf,
    lib_dir: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>, lib_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lib_dir: lib_dir.into(),
        }
    }
}

impl Workspace for FsWorkspace {
    fn resolve_lib(&self, lib: &str) -> PathBuf {
        resolve_lib(&self.root, &self.lib_dir, lib)
    }

    fn resolve_file(&self, path: &str) -> PathBuf {
        resolve_file(&self.root, path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        debug!("Reading {}", path.display());
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, text: &str) -> io::Result<()> {
        debug!("Writing {}", path.display());
        fs::write(path, text)
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        debug!("Deleting {}", path.display());
        fs::remove_file(path)
    }
}

/// A workspace held entirely in memory, rooted at `/workspace` with its
/// libraries under `/workspace/lib`.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorkspace {
    files: Rc<RefCell<HashMap<PathBuf, String>>>,
}

impl MemoryWorkspace {
    pub const ROOT: &'static str = "/workspace";
    pub const LIB_DIR: &'static str = "/workspace/lib";

    /// Adds a file, given relative to the workspace root.
    pub fn with_file(self, path: &str, text: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(Path::new(Self::ROOT).join(path), text.to_string());
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files
            .borrow()
            .get(&Path::new(Self::ROOT).join(path))
            .cloned()
    }
}

impl Workspace for MemoryWorkspace {
    fn resolve_lib(&self, lib: &str) -> PathBuf {
        resolve_lib(Path::new(Self::ROOT), Path::new(Self::LIB_DIR), lib)
    }

    fn resolve_file(&self, path: &str) -> PathBuf {
        resolve_file(Path::new(Self::ROOT), path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        self.files.borrow().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("No such file: {}", path.display()),
            )
        })
    }

    fn write(&self, path: &Path, text: &str) -> io::Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), text.to_string());
        Ok(())
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        self.files
            .borrow_mut()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("No such file: {}", path.display()),
                )
            })
    }
}

use std::fs::File;
use std::io::{Error, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use normalize_path::NormalizePath;
use tracing::{info, warn};

mod walk;

use neofile::{
    list, pack, repack, unpack, validate, ByteStream, Entry, FileType, FormatSpec, PackItem, PackOptions,
};

#[derive(Parser)]
#[clap(arg_required_else_help = true, about = "NeoFile archiver and unarchiver")]
struct Args {
    /// Create an archive.
    #[arg(short = 'c')]
    create: bool,
    /// Extract an archive.
    #[arg(short = 'x')]
    extract: bool,
    /// List an archive without reading content.
    #[arg(short = 't')]
    list: bool,
    /// Validate every checksum in an archive.
    #[arg(long)]
    validate: bool,
    /// Re-encode an archive, optionally changing checksum algorithms.
    #[arg(long)]
    repack: bool,
    /// Verbose (tracing) output.
    #[arg(short = 'v')]
    verbose: bool,
    /// Extract to specified directory instead of the current directory.
    #[arg(short = 'C')]
    chdir: Option<PathBuf>,
    /// An archive.
    #[arg(short = 'f')]
    file_name: PathBuf,
    /// Files or directories to pack, or the output path for repack.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "FILE"
    )]
    paths: Vec<PathBuf>,
}

enum Command {
    Create,
    Extract,
    List,
    Validate,
    Repack,
}

impl Args {
    fn command(&self) -> Result<Command, Error> {
        let flags = [self.create, self.extract, self.list, self.validate, self.repack];
        match flags.iter().filter(|f| **f).count() {
            0 => Err(Error::other("no command specified")),
            1 => Ok(if self.create {
                Command::Create
            } else if self.extract {
                Command::Extract
            } else if self.list {
                Command::List
            } else if self.validate {
                Command::Validate
            } else {
                Command::Repack
            }),
            _ => Err(Error::other("conflicting commands specified")),
        }
    }
}

fn main() -> ExitCode {
    match do_main() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn do_main() -> Result<ExitCode, Error> {
    let args = Args::parse();
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .init();
    }
    match args.command()? {
        Command::Create => create(args),
        Command::Extract => extract(args),
        Command::List => list_cmd(args),
        Command::Validate => validate_cmd(args),
        Command::Repack => repack_cmd(args),
    }
}

fn create(args: Args) -> Result<ExitCode, Error> {
    let spec = FormatSpec::default();
    let mut items = Vec::new();
    for path in &args.paths {
        collect(path, &mut items)?;
    }
    let bytes = pack(items, &spec, &PackOptions::default())
        .map_err(|e| Error::other(e.to_string()))?;
    std::fs::write(&args.file_name, bytes)?;
    Ok(ExitCode::SUCCESS)
}

fn collect(root: &Path, items: &mut Vec<PackItem>) -> Result<(), Error> {
    let metadata = root.metadata()?;
    if metadata.is_dir() {
        let walker = walk::Walker::new(root)?;
        for dir_entry in walker {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            let name = walker_name(root, &path)?;
            let file_type = dir_entry.file_type()?;
            let item = if file_type.is_dir() {
                PackItem {
                    entry: Entry::new(format!("{name}/"), FileType::Directory),
                    content: Vec::new(),
                }
            } else if file_type.is_symlink() {
                let link_target = std::fs::read_link(&path)?;
                let mut entry = Entry::new(name, FileType::Symlink);
                entry.flinkname = link_target.to_string_lossy().into_owned();
                PackItem {
                    entry,
                    content: Vec::new(),
                }
            } else {
                let mut content = Vec::new();
                File::open(&path)?.read_to_end(&mut content)?;
                PackItem {
                    entry: stamp_times(Entry::new(name, FileType::File), &path)?,
                    content,
                }
            };
            items.push(item);
        }
    } else {
        let mut content = Vec::new();
        File::open(root)?.read_to_end(&mut content)?;
        let name = root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        items.push(PackItem {
            entry: stamp_times(Entry::new(name, FileType::File), root)?,
            content,
        });
    }
    Ok(())
}

fn walker_name(root: &Path, path: &Path) -> Result<String, Error> {
    let stripped = path.strip_prefix(root).unwrap_or(path).normalize();
    Ok(stripped.to_string_lossy().replace('\\', "/"))
}

fn stamp_times(mut entry: Entry, path: &Path) -> Result<Entry, Error> {
    let metadata = path.metadata()?;
    entry.fsize = metadata.len();
    if let Ok(modified) = metadata.modified() {
        entry.fmtime = to_epoch_secs(modified);
    }
    Ok(entry)
}

fn to_epoch_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn extract(args: Args) -> Result<ExitCode, Error> {
    let spec = FormatSpec::default();
    let dest_dir = args.chdir.clone().unwrap_or_else(|| PathBuf::from("."));
    let file = File::open(&args.file_name)?;
    let mut stream = ByteStream::from_file(file);
    unpack(&mut stream, &spec, Some(&dest_dir)).map_err(|e| Error::other(e.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

fn list_cmd(args: Args) -> Result<ExitCode, Error> {
    let spec = FormatSpec::default();
    let file = File::open(&args.file_name)?;
    let mut stream = ByteStream::from_file(file);
    let entries = list(&mut stream, &spec).map_err(|e| Error::other(e.to_string()))?;
    for entry in entries {
        println!("{}", entry.fname);
    }
    Ok(ExitCode::SUCCESS)
}

fn validate_cmd(args: Args) -> Result<ExitCode, Error> {
    let spec = FormatSpec::default();
    let file = File::open(&args.file_name)?;
    let mut stream = ByteStream::from_file(file);
    let (ok, details) = validate(&mut stream, &spec).map_err(|e| Error::other(e.to_string()))?;
    for detail in &details {
        if !detail.ok {
            warn!(fname = %detail.fname, failed = ?detail.failed_scopes, "checksum mismatch");
        }
    }
    info!(count = details.len(), ok, "archive validated");
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn repack_cmd(args: Args) -> Result<ExitCode, Error> {
    let spec = FormatSpec::default();
    let out_path = args
        .paths
        .first()
        .ok_or_else(|| Error::other("repack requires an output path"))?;
    let file = File::open(&args.file_name)?;
    let mut stream = ByteStream::from_file(file);
    let bytes = repack(&mut stream, &spec, &spec, &PackOptions::default())
        .map_err(|e| Error::other(e.to_string()))?;
    std::fs::write(out_path, bytes)?;
    Ok(ExitCode::SUCCESS)
}

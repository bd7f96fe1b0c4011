use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, Parser};

use blankspace::bytecode::compile::DEFAULT_MAX_BYTECODE_SIZE;
use blankspace::bytecode::{CompileError, Compiler, CompilerConfig, ImageError, Program, disasm};
use blankspace::frontend::reader::DEFAULT_MAX_SOURCE_SIZE;
use blankspace::frontend::token_dumper::{TokenDumper, encode_visible};
use blankspace::frontend::{ReadError, TokenBuffer};
use blankspace::runtime::vm_bc::{DEFAULT_CALL_STACK_SIZE, DEFAULT_HEAP_SIZE, DEFAULT_STACK_SIZE};
use blankspace::runtime::{RuntimeError, Vm, VmConfig};

/// Whitespace compiler and bytecode interpreter
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(
    ArgGroup::new("mode")
        .args(["bytecode", "mnemonic", "filter", "blankspace", "compile", "exec_image"])
))]
struct Cli {
    /// Source file, or `-` for standard input
    file: PathBuf,

    /// Print the compiled bytecode as a hex dump
    #[arg(short, long)]
    bytecode: bool,

    /// Print the compiled bytecode as a mnemonic listing
    #[arg(short, long)]
    mnemonic: bool,

    /// Print the source with space and tab shown as S and T
    #[arg(short, long)]
    filter: bool,

    /// Turn S/T text back into whitespace source
    #[arg(short = 's', long)]
    blankspace: bool,

    /// Compile and write a bytecode image
    #[arg(short, long, requires = "output")]
    compile: bool,

    /// Execute a bytecode image instead of source
    #[arg(short = 'x', long)]
    exec_image: bool,

    /// Write output here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Colorize the filter output
    #[arg(long)]
    color: bool,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_STACK_SIZE)]
    stack_size: usize,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_HEAP_SIZE)]
    heap_size: usize,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_CALL_STACK_SIZE)]
    call_stack_size: usize,

    /// Abort after this many executed instructions
    #[arg(long, value_name = "N")]
    max_steps: Option<usize>,

    /// Maximum number of significant source characters
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_SOURCE_SIZE)]
    max_source_size: usize,

    /// Maximum bytecode size in bytes
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_BYTECODE_SIZE)]
    max_bytecode_size: usize,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn vm_config(&self) -> VmConfig {
        VmConfig {
            stack_size: self.stack_size,
            heap_size: self.heap_size,
            call_stack_size: self.call_stack_size,
            max_steps: self.max_steps,
        }
    }

    fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            max_bytecode_size: self.max_bytecode_size,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logger(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => return,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("Failed to install logger: {}", e);
    }
}

/// 1 usage or I/O, 2 compile, 3 runtime fault.
fn exit_status(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<RuntimeError>().is_some() {
        3
    } else if err.downcast_ref::<CompileError>().is_some()
        || err.downcast_ref::<ImageError>().is_some()
        || matches!(
            err.downcast_ref::<ReadError>(),
            Some(ReadError::TooLarge { .. })
        )
    {
        2
    } else {
        1
    }
}

fn run(cli: &Cli) -> Result<()> {
    let raw = read_input(&cli.file)?;

    if cli.blankspace {
        let mut out = open_output(cli.output.as_deref())?;
        out.write_all(&encode_visible(&raw))?;
        return Ok(out.flush()?);
    }

    let prog = if cli.exec_image {
        Program::from_image(&raw)
            .with_context(|| format!("Failed to load image '{}'", cli.file.display()))?
    } else {
        let tokens = TokenBuffer::from_bytes(&raw, cli.max_source_size)?;
        if cli.filter {
            let dumper = TokenDumper {
                color: cli.color,
            };
            let mut out = open_output(cli.output.as_deref())?;
            dumper.visualize(&mut out, &tokens)?;
            return Ok(out.flush()?);
        }
        let prog = Compiler::with_config(cli.compiler_config()).compile(&tokens)?;
        for diagnostic in &prog.diagnostics {
            eprintln!("{}", diagnostic);
        }
        prog
    };

    if cli.bytecode || cli.mnemonic {
        let mut out = open_output(cli.output.as_deref())?;
        if cli.bytecode {
            disasm::write_hex(&mut out, &prog.bytecode)?;
        } else {
            disasm::write_mnemonic(&mut out, &prog)?;
        }
        return Ok(out.flush()?);
    }

    prog.ensure_linked()?;

    if cli.compile {
        let image = prog.to_image()?;
        if let Some(path) = &cli.output {
            fs::write(path, image)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            log::info!("wrote {} bytes of bytecode to {}", prog.len(), path.display());
        }
        return Ok(());
    }

    execute(cli, &prog)
}

fn execute(cli: &Cli, prog: &Program) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());

    let mut vm = Vm::with_config(cli.vm_config());
    let result = vm.run(prog, &mut input, &mut output);
    for diagnostic in vm.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    log::info!("executed {} steps", vm.steps());
    Ok(result?)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    if path == Path::new("-") {
        io::stdin()
            .read_to_end(&mut raw)
            .context("Failed to read standard input")?;
    } else {
        raw = fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    }
    Ok(raw)
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("Unable to open file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

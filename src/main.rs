//! Octet Emulator - CLI Entry Point
//!
//! Commands:
//! - `octet-emu run [program]` - Load `0`/`1` lines (file or stdin) and execute
//! - `octet-emu asm <source>` - Assemble mnemonics to `0`/`1` lines
//! - `octet-emu disasm <program>` - Disassemble `0`/`1` lines
//! - `octet-emu test` - Built-in self-test

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};

use octet::asm::loader::{self, LoadDiagnostic, PROMPT};
use octet::cpu::{TraceFormat, WriteTrace};
use octet::{load_config, Cpu, Profile, ProgramLoader, RegisterIndex, RegisterMap, VmConfig, VmState};

#[derive(Parser)]
#[command(name = "octet-emu")]
#[command(version = "0.1.0")]
#[command(about = "An interpreter for a tiny 8-bit instruction set")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a program and run it until it halts or runs off the end
    Run {
        /// File of `0`/`1` lines; reads stdin when omitted
        program: Option<String>,
        #[command(flatten)]
        engine: EngineArgs,
        /// Initial register value, e.g. `R0=4` (repeatable)
        #[arg(long = "reg", value_name = "Rn=VALUE")]
        registers: Vec<String>,
        /// Seed registers the way the stock demo programs expect
        #[arg(long)]
        reference_seed: bool,
        /// Trace output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: FormatArg,
        /// Print registers, memory and PC after the run
        #[arg(short, long)]
        dump: bool,
    },
    /// Assemble source to `0`/`1` lines
    Asm {
        /// Path to the source file
        source: String,
        #[command(flatten)]
        engine: EngineArgs,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a file of `0`/`1` lines
    Disasm {
        /// Path to the program file
        program: String,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Run the built-in self-test
    Test,
}

/// Options selecting the opcode table and register map.
#[derive(Args)]
struct EngineArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Opcode table
    #[arg(short, long, value_enum, required_unless_present = "config")]
    profile: Option<ProfileArg>,
    /// Register field mapping
    #[arg(short, long, value_enum, required_unless_present = "config")]
    regmap: Option<RegMapArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    /// ADD MOV SUB LD ST JMP JZ HLT
    Jump,
    /// ADD MOV SUB LD ST JMP AND OR
    Bitwise,
}

#[derive(Clone, Copy, ValueEnum)]
enum RegMapArg {
    /// 00=R0 01=R1 10=R2 11=R3
    Identity,
    /// 01=R0 11=R1, others fall back to R0
    Remapped,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<ProfileArg> for Profile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::Jump => Profile::Jump,
            ProfileArg::Bitwise => Profile::Bitwise,
        }
    }
}

impl From<RegMapArg> for RegisterMap {
    fn from(m: RegMapArg) -> Self {
        match m {
            RegMapArg::Identity => RegisterMap::Identity,
            RegMapArg::Remapped => RegisterMap::Remapped,
        }
    }
}

impl From<FormatArg> for TraceFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Text => TraceFormat::Text,
            FormatArg::Json => TraceFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();

    match cli.command {
        Some(Commands::Run { program, engine, registers, reference_seed, format, dump }) => {
            let mut config = resolve_config(&engine);
            if reference_seed {
                config = config.with_reference_seed();
            }
            for assignment in &registers {
                match parse_register_assignment(assignment) {
                    Ok((reg, value)) => config = config.with_register(reg, value),
                    Err(message) => fail(&message),
                }
            }
            run_program(program.as_deref(), &config, format.into(), dump);
        }
        Some(Commands::Asm { source, engine, output }) => {
            assemble_file(&source, &resolve_config(&engine), output.as_deref());
        }
        Some(Commands::Disasm { program, engine }) => {
            disassemble_file(&program, &resolve_config(&engine));
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("Octet Emulator v0.1.0");
            println!("An interpreter for a tiny 8-bit instruction set");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

fn resolve_config(engine: &EngineArgs) -> VmConfig {
    let mut config = match &engine.config {
        Some(path) => load_config(path).unwrap_or_else(|e| fail(&format!("Failed to load config: {}", e))),
        None => match (engine.profile, engine.regmap) {
            (Some(p), Some(m)) => VmConfig::new(p.into(), m.into()),
            _ => fail("--profile and --regmap are required without --config"),
        },
    };
    // Flags override the file
    if let Some(p) = engine.profile {
        config = config.with_profile(p.into());
    }
    if let Some(m) = engine.regmap {
        config.register_map = m.into();
    }
    config
}

/// Parse `R2=17`.
fn parse_register_assignment(assignment: &str) -> Result<(RegisterIndex, u8), String> {
    let (name, value) = assignment
        .split_once('=')
        .ok_or_else(|| format!("expected Rn=VALUE, found {:?}", assignment))?;
    let reg = name
        .trim()
        .strip_prefix(['R', 'r'])
        .and_then(|n| n.parse::<u8>().ok())
        .and_then(RegisterIndex::new)
        .ok_or_else(|| format!("unknown register {:?}", name))?;
    let value = value
        .trim()
        .parse::<u8>()
        .map_err(|_| format!("register value must be 0-255, found {:?}", value))?;
    Ok((reg, value))
}

fn print_rejection(diagnostic: &LoadDiagnostic) {
    println!("{}", diagnostic.message());
}

fn run_program(path: Option<&str>, config: &VmConfig, format: TraceFormat, dump: bool) {
    let loader = ProgramLoader::new(config.capacity);

    let report = match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .unwrap_or_else(|e| fail(&format!("Failed to read file: {}", e)));
            loader.load_with(io::BufReader::new(file), print_rejection)
        }
        None => {
            println!("{}", PROMPT);
            let stdin = io::stdin();
            loader.load_with(stdin.lock(), print_rejection)
        }
    }
    .unwrap_or_else(|e| fail(&format!("Failed to load program: {}", e)));

    let cpu = Cpu::from_config(config);
    let mut state = VmState::from_config(config);
    let mut trace = WriteTrace::new(io::stdout().lock(), format);
    let summary = cpu.run(&mut state, &report.program, &mut trace);
    if let Err(e) = trace.finish() {
        fail(&format!("Failed to write trace: {}", e));
    }

    if dump {
        println!();
        println!("━━━ Result ━━━");
        println!("Stop:    {:?} after {} instructions", summary.stop, summary.executed);
        println!("PC:      {}", state.pc);
        for reg in RegisterIndex::ALL {
            println!("R{}:      {}", reg, state.regs.read(reg));
        }
        println!("MEM:     {:?}", state.mem.cells());
    }
}

fn assemble_file(source_path: &str, config: &VmConfig, output: Option<&str>) {
    let source = std::fs::read_to_string(source_path)
        .unwrap_or_else(|e| fail(&format!("Failed to read file: {}", e)));
    let cpu = Cpu::from_config(config);

    let words = octet::assemble(&source, &cpu)
        .unwrap_or_else(|e| fail(&format!("Assembly error: {}", e)));
    log::info!("assembled {} instructions from {}", words.len(), source_path);

    let result = match output {
        Some(path) => std::fs::File::create(path)
            .map_err(|e| loader::LoadError::Io(e.to_string()))
            .and_then(|file| loader::write_program(io::BufWriter::new(file), &words)),
        None => loader::write_program(io::stdout().lock(), &words),
    };
    if let Err(e) = result {
        fail(&format!("Failed to write program: {}", e));
    }
}

fn disassemble_file(path: &str, config: &VmConfig) {
    let report = loader::load_program_file(path, config.capacity)
        .unwrap_or_else(|e| fail(&format!("Failed to load program: {}", e)));
    for diagnostic in &report.diagnostics {
        eprintln!("⚠️  {}", diagnostic);
    }

    let cpu = Cpu::from_config(config);
    print!("{}", octet::disassemble(&cpu, report.program.words()));
}

fn run_self_test() {
    use octet::cpu::{encode, Program};

    println!("━━━ Octet Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, lines: Vec<String>, expected: &[&str]| {
        print!("{}... ", name);
        if lines == expected {
            println!("✓");
            passed += 1;
        } else {
            println!("✗ (got {:?})", lines);
            failed += 1;
        }
    };

    // ADD R0, R3 with R0=4, R3=3 (remapped encoding)
    let cpu = Cpu::for_profile(Profile::Jump, RegisterMap::Remapped);
    let mut state = VmState::from_config(&VmConfig::new(Profile::Jump, RegisterMap::Remapped).with_reference_seed());
    let mut lines: Vec<String> = Vec::new();
    if let Ok(program) = Program::from_words(&[0b000_01_011]) {
        cpu.run(&mut state, &program, &mut lines);
    }
    check("ADD R0, R3", lines, &["R0 = R0 + R3 = 7"]);

    // MOV R1, #0 (identity encoding)
    let cpu = Cpu::for_profile(Profile::Bitwise, RegisterMap::Identity);
    let mut state = VmState::new();
    let mut lines: Vec<String> = Vec::new();
    if let Ok(program) = Program::from_words(&[0b001_01_000]) {
        cpu.run(&mut state, &program, &mut lines);
    }
    check("MOV R1, #0", lines, &["R1 = 0"]);

    // JMP 2; MOV R0, #5; HLT
    let cpu = Cpu::for_profile(Profile::Jump, RegisterMap::Identity);
    let mut state = VmState::new();
    let mut lines: Vec<String> = Vec::new();
    if let Ok(program) = Program::from_words(&[encode(5, 0, 2), encode(1, 0, 5), encode(7, 0, 0)]) {
        cpu.run(&mut state, &program, &mut lines);
    }
    check("JMP over MOV to HLT", lines, &["JMP to 2", "HLT: Halting"]);

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}

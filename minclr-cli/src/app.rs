use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// minclr - load managed images and run their methods in a minimal CLI virtual machine
#[derive(Debug, Parser)]
#[command(name = "minclr", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log every call and executed instruction (trace-level).
    #[arg(long, global = true)]
    pub trace: bool,
}

/// Engine limits, mapped onto `EngineConfig`.
#[derive(Debug, Parser)]
pub struct EngineOptions {
    /// Evaluation stack capacity in bytes.
    #[arg(long, value_name = "BYTES")]
    pub stack_size: Option<usize>,

    /// Maximum number of nested calls.
    #[arg(long, value_name = "DEPTH")]
    pub max_call_depth: Option<usize>,

    /// Object heap capacity in bytes.
    #[arg(long, value_name = "BYTES")]
    pub heap_size: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute a static method and print its return value.
    Run {
        /// Path to the program image.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Path to the core library; without it the program must define the built-in types.
        #[arg(long, value_name = "FILE")]
        corlib: Option<PathBuf>,

        /// Declaring type as Namespace.Name; defaults to the entry point's type.
        #[arg(long, value_name = "TYPE")]
        r#type: Option<String>,

        /// Method name; defaults to the entry point.
        #[arg(long, value_name = "NAME")]
        method: Option<String>,

        /// Integer arguments, in declaration order, converted to the parameter types.
        #[arg(long = "arg", value_name = "INT", allow_negative_numbers = true)]
        args: Vec<i32>,

        #[command(flatten)]
        engine: EngineOptions,
    },

    /// List the classes of an image with their layouts and methods.
    Types {
        /// Path to the image.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Path to the core library, needed to lay out types deriving from it.
        #[arg(long, value_name = "FILE")]
        corlib: Option<PathBuf>,

        /// Filter by namespace.
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Disassemble method bodies.
    Disasm {
        /// Path to the image.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Path to the core library the image references.
        #[arg(long, value_name = "FILE")]
        corlib: Option<PathBuf>,

        /// Only methods of this type, as Namespace.Name.
        #[arg(long, value_name = "TYPE")]
        r#type: Option<String>,

        /// Only methods with this name.
        #[arg(long, value_name = "NAME")]
        method: Option<String>,
    },

    /// Generate a core library and a sample program, then run the program.
    Demo {
        /// Write the generated images into this directory.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Number of Fibonacci numbers the sample prints.
        #[arg(long, default_value_t = 10)]
        count: i32,

        #[command(flatten)]
        engine: EngineOptions,
    },
}

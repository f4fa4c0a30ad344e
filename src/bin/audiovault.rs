//! audiovault CLI - Password-protected audio with transcription
//!
//! Command-line interface for encrypting and decrypting audio files in
//! place, and for running the full decrypt -> transcribe/translate ->
//! re-encrypt pipeline against an external speech-to-text command.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use audiovault::collab::{CommandTranscoder, CommandTranscriber, CommandTranslator, Transcoder};
use audiovault::password::{
    CachingPasswordReader, PasswordReader, ReaderPasswordReader, TerminalPasswordReader,
};
use audiovault::pipeline::{Pipeline, RunOutcome};
use audiovault::source::Source;
use audiovault::vault::{self, AssetState};

#[derive(Parser)]
#[command(name = "audiovault")]
#[command(version)]
#[command(about = "Password-protected audio with transcription.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    password_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt an audio file in place
    #[command(alias = "e")]
    Encrypt {
        /// Path to the audio file to encrypt
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Decrypt an audio file in place
    #[command(alias = "d")]
    Decrypt {
        /// Path to the audio file to decrypt
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Report whether a file is in plaintext or ciphertext state
    #[command(alias = "s")]
    Status {
        /// Path to the audio file to inspect
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Re-encode an audio file into another container via an external command
    #[command(alias = "r")]
    Reencode {
        /// Path to the input audio file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the re-encoded audio to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// External command invoked as `CMD <input> <output>`
        #[arg(long, value_name = "CMD")]
        cmd: String,
    },

    /// Decrypt, transcribe (and optionally translate), then re-encrypt
    Run {
        /// Path to an encrypted audio file to operate on
        #[arg(short, long, value_name = "FILE", conflicts_with = "dir")]
        file: Option<PathBuf>,

        /// Directory of audio files to pick from
        #[arg(long, value_name = "DIR", requires = "pick")]
        dir: Option<PathBuf>,

        /// Zero-based index into the sorted audio file listing of --dir
        #[arg(long, value_name = "N")]
        pick: Option<usize>,

        /// Transcription command; invoked as `CMD <audio-file>`, must print
        /// {"text": ..., "language": ...} JSON on stdout
        #[arg(long, value_name = "CMD")]
        transcribe_cmd: String,

        /// Translation command; invoked as `CMD <target-lang>` with the
        /// transcript on stdin
        #[arg(long, value_name = "CMD", requires = "target_lang")]
        translate_cmd: Option<String>,

        /// Target language code; requests translation of the transcript
        #[arg(long, value_name = "CODE", requires = "translate_cmd")]
        target_lang: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encrypt { file } => {
            let mut reader = get_password_reader(cli.password_stdin);
            let password = exit_on_err(reader.read_password());
            exit_on_err(vault::encrypt_in_place(&file, &password));
            println!("File '{}' has been encrypted.", file.display());
        }
        Commands::Decrypt { file } => {
            let mut reader = get_password_reader(cli.password_stdin);
            let password = exit_on_err(reader.read_password());
            if let Err(e) = vault::decrypt_in_place(&file, &password) {
                eprintln!("Decryption failed: {:#}", e);
                process::exit(1);
            }
            println!("File '{}' has been decrypted.", file.display());
        }
        Commands::Status { file } => {
            let state = exit_on_err(vault::asset_state(&file));
            match state {
                AssetState::Plaintext => println!("{}: plaintext", file.display()),
                AssetState::Ciphertext => println!("{}: encrypted", file.display()),
            }
        }
        Commands::Reencode { input, output, cmd } => {
            let transcoder = CommandTranscoder::new(cmd);
            exit_on_err(transcoder.transcode(&input, &output));
            println!("Audio re-encoded to {}.", output.display());
        }
        Commands::Run {
            file,
            dir,
            pick,
            transcribe_cmd,
            translate_cmd,
            target_lang,
        } => {
            let mut source = match (file, dir, pick) {
                (Some(path), _, _) => Source::Upload { path },
                (None, Some(dir), Some(pick)) => Source::ExistingFile { dir, pick },
                _ => {
                    eprintln!("Error: either --file or --dir with --pick is required");
                    process::exit(1);
                }
            };

            let transcriber = CommandTranscriber::new(transcribe_cmd);
            let translator = translate_cmd.map(CommandTranslator::new);
            let mut pipeline = Pipeline::new(&transcriber);
            if let Some(ref translator) = translator {
                pipeline = pipeline.with_translator(translator);
            }

            let mut reader = CachingPasswordReader::new(get_password_reader(cli.password_stdin));
            let outcome = pipeline.run(&mut source, &mut reader, target_lang.as_deref());
            report_outcome(outcome);
        }
    }
}

fn report_outcome(outcome: RunOutcome) {
    match outcome {
        RunOutcome::Completed(result) => {
            println!("Detected language: {}", result.detected_language);
            println!("Transcription: {}", result.text);
            if let Some(translated) = result.translated_text {
                println!("Translation: {}", translated);
            }
        }
        RunOutcome::Failed(failure) => {
            eprintln!("Pipeline failed while {}: {:#}", failure.stage, failure.error);
            if failure.asset_left_plaintext {
                eprintln!("WARNING: the audio file was left UNENCRYPTED on disk.");
                eprintln!("Re-run 'audiovault encrypt' once the underlying problem is fixed.");
                process::exit(2);
            }
            process::exit(1);
        }
    }
}

fn exit_on_err<T>(result: audiovault::error::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn get_password_reader(use_stdin: bool) -> Box<dyn PasswordReader> {
    if use_stdin {
        Box::new(ReaderPasswordReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPasswordReader)
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use env_logger::Env;

use phoneme_tts::engines::concat::{
    CmuDict, ConcatEngine, ConcatError, ConcatInferenceParamsBuilder, ExternalG2p,
    Grapheme2Phoneme, Representation, SampleFilter, SampleLibrary, SampleTransform, SymbolRename,
    SynthesisParams, TransliterationOutputs,
};
use phoneme_tts::SynthesisEngine;

#[derive(Debug, Parser)]
#[command(name = "phoneme-tts")]
#[command(about = "Utilities for preparing text and audio for handheld concatenative TTS")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Transliterate a text into its phonetic representations
    Transliterate(TransliterateArgs),
    /// Convert a directory of phoneme recordings to the device format
    Resample(ResampleArgs),
    /// Convert text to speech, one WAV per line
    Tts(TtsArgs),
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct G2pSelection {
    /// Pronunciation dictionary in CMU format
    #[arg(long)]
    dict: Option<PathBuf>,
    /// External g2p command; reads a line on stdin, prints a JSON token array
    #[arg(long)]
    g2p_command: Option<String>,
}

#[derive(Debug, Args)]
struct TransliterateArgs {
    /// Source text to transcribe
    input_file: PathBuf,
    #[command(flatten)]
    g2p: G2pSelection,
    /// JSON output for g2p allophones
    #[arg(long)]
    output_g2p: Option<PathBuf>,
    /// JSON output for IPA allophones
    #[arg(long)]
    output_ipa_allo: Option<PathBuf>,
    /// JSON output for IPA phonemes
    #[arg(long)]
    output_ipa_phon: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ResampleArgs {
    /// Directory holding the source recordings
    input_directory: PathBuf,
    /// Directory the converted recordings are written to
    output_directory: PathBuf,
    /// Only load files with this extension
    #[arg(long)]
    extension: Option<String>,
    /// Rename IPA allophone files to their g2p tokens
    #[arg(long)]
    rename_to_g2p: bool,
}

#[derive(Debug, Args)]
struct TtsArgs {
    /// Source text file, one utterance per line
    input_file: PathBuf,
    /// Directory that will hold the output WAVs
    output_directory: PathBuf,
    /// Directory holding the reference phones
    phone_directory: PathBuf,
    /// Alphabet the reference phones are named in
    #[arg(value_enum)]
    phone_type: Representation,
    #[command(flatten)]
    g2p: G2pSelection,
    /// JSON file with synthesis parameters
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip lines with no synthesizable words instead of failing
    #[arg(long)]
    skip_empty_lines: bool,
}

fn build_g2p(selection: &G2pSelection) -> Result<Box<dyn Grapheme2Phoneme>, ConcatError> {
    match (&selection.dict, &selection.g2p_command) {
        (Some(dict), _) => Ok(Box::new(CmuDict::load(dict)?)),
        (None, Some(command)) => ExternalG2p::from_command_line(command)
            .map(|g2p| Box::new(g2p) as Box<dyn Grapheme2Phoneme>)
            .ok_or_else(|| ConcatError::G2pNotFound(command.clone())),
        (None, None) => Err(ConcatError::G2pNotFound(String::new())),
    }
}

fn load_synthesis_params(path: Option<&Path>) -> Result<SynthesisParams, ConcatError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        None => Ok(SynthesisParams::default()),
    }
}

fn transliterate(args: TransliterateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ConcatEngine::new(build_g2p(&args.g2p)?);
    let text = fs::read_to_string(&args.input_file)?;
    let outputs = TransliterationOutputs {
        g2p_allophones: args.output_g2p,
        ipa_allophones: args.output_ipa_allo,
        ipa_phonemes: args.output_ipa_phon,
    };

    let transliteration = engine.transliterate(&text, &outputs)?;
    log::info!("Transliterated {} lines", transliteration.len());
    Ok(())
}

fn resample(args: ResampleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let filter = args
        .extension
        .map(SampleFilter::Extension)
        .unwrap_or_default();
    let rename = if args.rename_to_g2p {
        SymbolRename::IpaToG2p
    } else {
        SymbolRename::Keep
    };

    let (_, report) = SampleLibrary::load_and_export(
        &args.input_directory,
        &args.output_directory,
        &filter,
        &SampleTransform::DeviceResample,
        &rename,
    )?;
    if !report.skipped.is_empty() {
        log::warn!("Skipped samples: {}", report.skipped.join(", "));
    }
    Ok(())
}

fn tts(args: TtsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = ConcatEngine::new(build_g2p(&args.g2p)?);
    engine.load_model(&args.phone_directory)?;

    let params = ConcatInferenceParamsBuilder::default()
        .representation(args.phone_type)
        .synthesis(load_synthesis_params(args.config.as_deref())?)
        .skip_empty_lines(args.skip_empty_lines)
        .build()?;

    let text = fs::read_to_string(&args.input_file)?;
    let lines = engine.synthesize_to_dir(&text, &args.output_directory, &params)?;
    log::info!(
        "Synthesized {} lines into {}",
        lines.len(),
        args.output_directory.display()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Transliterate(args) => transliterate(args)?,
        Commands::Resample(args) => resample(args)?,
        Commands::Tts(args) => tts(args)?,
    }

    println!("Finished successfully!");
    Ok(())
}

use std::path::PathBuf;
use std::time::Instant;

use phoneme_tts::{
    engines::concat::{
        CmuDict, ConcatEngine, ConcatInferenceParamsBuilder, ConcatModelParams, Representation,
        SampleTransform,
    },
    SynthesisEngine,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dict = CmuDict::load(&PathBuf::from("models/cmudict.dict"))?;
    let mut engine = ConcatEngine::new(Box::new(dict));
    let phone_path = PathBuf::from("models/phones/ipa_phons");

    let load_start = Instant::now();
    engine.load_model_with_params(
        &phone_path,
        ConcatModelParams {
            transform: SampleTransform::DeviceResample,
            ..Default::default()
        },
    )?;
    println!("Samples loaded in {:.2?}", load_start.elapsed());

    println!("Available phones: {:?}", engine.list_symbols());

    let text = "Hello there.\nThe cat sat on the mat.\nGood night!";

    let params = ConcatInferenceParamsBuilder::default()
        .representation(Representation::IpaPhonemes)
        .skip_empty_lines(true)
        .build()?;

    let synth_start = Instant::now();
    let lines = engine.synthesize(text, &params)?;
    let synth_dur = synth_start.elapsed();

    let audio_duration: f64 = lines.iter().map(|l| l.audio.duration_secs()).sum();
    println!(
        "Synthesized {} lines, {:.2}s of audio in {:.2?}",
        lines.len(),
        audio_duration,
        synth_dur
    );

    let output_dir = PathBuf::from("output");
    engine.synthesize_to_dir(text, &output_dir, &params)?;
    println!("Saved to {}", output_dir.display());

    engine.unload_model();
    Ok(())
}

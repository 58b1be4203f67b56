// Copyright (c) 2024 Mike Tsao

use patchbay::prelude::*;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct TestFilter;
impl ModuleCore for TestFilter {
    fn create_graph(&mut self) -> anyhow::Result<ModuleGraph> {
        Ok(ModuleGraph::stereo_in_out())
    }

    fn set_param(&mut self, _name: &str, _value: f64) {}
}

#[derive(Debug, Default)]
struct TestOsc;
impl ModuleCore for TestOsc {
    fn create_graph(&mut self) -> anyhow::Result<ModuleGraph> {
        Ok(ModuleGraph::mono_in_out())
    }

    fn set_param(&mut self, _name: &str, _value: f64) {}
}

fn engine_with_clock() -> (Engine, ManualTimeSource) {
    let clock = ManualTimeSource::default();
    (Engine::new_with(Box::new(clock.clone())), clock)
}

fn register_test_modules(e: &mut Engine) {
    let mut filter = ModuleDescriptorBuilder::default()
        .key("ladder-filter")
        .category(Category::Filter)
        .description("A four-pole resonant lowpass")
        .tag("lowpass")
        .build()
        .unwrap();
    filter.defaults.insert("cutoff".to_string(), 0.5);
    filter.defaults.insert("resonance".to_string(), 0.1);
    e.register_module(filter, || Box::new(TestFilter));

    e.register_module(
        ModuleDescriptorBuilder::default()
            .key("saw-osc")
            .category(Category::Oscillator)
            .build()
            .unwrap(),
        || Box::new(TestOsc),
    );
}

// Builds a two-module patch, automates the filter with a timed morph, and
// watches the morph resolve tick by tick.
#[test]
fn demo_patch_with_timed_morph() {
    let (mut engine, clock) = engine_with_clock();
    register_test_modules(&mut engine);

    let osc_uid = engine
        .create_module(&ModuleKey::from("saw-osc"), &Default::default())
        .unwrap();
    let filter_uid = engine
        .create_module(&ModuleKey::from("ladder-filter"), &Default::default())
        .unwrap();

    // Wire osc → filter → main out.
    assert!(engine
        .connect(&osc_uid, ConnectionTarget::Module(filter_uid.clone()), 0, 0)
        .is_ok());
    assert!(engine
        .connect(
            &filter_uid,
            ConnectionTarget::External("main-out".to_string()),
            0,
            0
        )
        .is_ok());

    // Sweep the cutoff over one second with a decelerating curve.
    let cutoff = ParamName(format!("{filter_uid}.cutoff"));
    engine.morph_param(&cutoff, 1.0, Millis(1000.0), Easing::EaseOutQuad);
    assert!(engine.needs_tick());

    clock.set(Millis(500.0));
    engine.advance();
    let midway = engine.param_value(&cutoff).unwrap();
    assert!(
        midway > 0.5 && midway < 1.0,
        "an ease-out sweep from 0.5 should be past halfway at t=0.5: {midway}"
    );

    clock.set(Millis(1000.0));
    engine.advance();
    assert_eq!(
        engine.param_value(&cutoff),
        Some(1.0),
        "a finished morph lands exactly on its target"
    );
    assert!(!engine.needs_tick(), "nothing left to animate");

    // The instance saw every routed write.
    assert_eq!(
        engine.get_instance(&filter_uid).unwrap().param_value("cutoff"),
        Some(1.0)
    );
}

// A macro fans one gesture out to several parameters through per-target
// ranges and curves.
#[test]
fn demo_macro_fan_out() {
    let (mut engine, _clock) = engine_with_clock();

    engine.register_param(ParamName::from("filter.cutoff"), ParamConfig::normalized(0.3));
    engine.register_param(ParamName::from("reverb.mix"), ParamConfig::normalized(0.0));

    engine.register_macro(
        MacroId::from("energy"),
        "Energy",
        vec![
            MacroMappingBuilder::default()
                .target("filter.cutoff")
                .min(0.3)
                .max(0.9)
                .curve(MacroCurve::Exponential)
                .build()
                .unwrap(),
            MacroMappingBuilder::default()
                .target("reverb.mix")
                .min(0.0)
                .max(0.5)
                .build()
                .unwrap(),
        ],
    );

    engine.set_macro(&MacroId::from("energy"), 0.5, Millis::zero());

    // Exponential curving squares the scalar: 0.3 + (0.9 - 0.3) * 0.25.
    assert_eq!(
        engine.param_value(&ParamName::from("filter.cutoff")),
        Some(0.45)
    );
    assert_eq!(engine.param_value(&ParamName::from("reverb.mix")), Some(0.25));
}

// A macro can animate its own scalar; the eased scalar is re-applied through
// the mappings every tick.
#[test]
fn demo_macro_motion() {
    let (mut engine, clock) = engine_with_clock();
    engine.register_param(ParamName::from("drive"), ParamConfig::normalized(0.0));
    engine.register_macro(
        MacroId::from("intensity"),
        "Intensity",
        vec![MacroMappingBuilder::default().target("drive").build().unwrap()],
    );

    engine.morph_macro(&MacroId::from("intensity"), 1.0, Millis(400.0), Easing::Linear);
    assert!(engine.needs_tick());

    clock.set(Millis(100.0));
    engine.advance();
    assert_eq!(engine.param_value(&ParamName::from("drive")), Some(0.25));
    assert_eq!(engine.macro_value(&MacroId::from("intensity")), Some(0.25));

    clock.set(Millis(400.0));
    engine.advance();
    assert_eq!(engine.param_value(&ParamName::from("drive")), Some(1.0));
    assert!(!engine.needs_tick());
}

// Captures two scenes, crossfades between them, and round-trips a bank.
#[test]
fn demo_ab_morph_and_banks() {
    let (mut engine, clock) = engine_with_clock();
    engine.register_param(ParamName::from("pad.level"), ParamConfig::new(0.0, 10.0, 0.0));
    engine.register_param(ParamName::from("lead.level"), ParamConfig::new(0.0, 10.0, 0.0));

    // Scene A: pad only.
    engine.set_param_value(&ParamName::from("pad.level"), 8.0);
    engine.set_param_value(&ParamName::from("lead.level"), 0.0);
    engine.capture_slot(Slot::A, "pads");

    // Scene B: lead only.
    engine.set_param_value(&ParamName::from("pad.level"), 0.0);
    engine.set_param_value(&ParamName::from("lead.level"), 6.0);
    engine.capture_slot(Slot::B, "leads");

    // Halfway between the scenes.
    engine.set_morph_position(0.5, Millis::zero());
    assert_eq!(engine.param_value(&ParamName::from("pad.level")), Some(4.0));
    assert_eq!(engine.param_value(&ParamName::from("lead.level")), Some(3.0));

    // A timed crossfade the rest of the way to B.
    engine.morph_to(1.0, Millis(200.0), Easing::Linear);
    clock.set(Millis(200.0));
    engine.advance();
    assert_eq!(engine.param_value(&ParamName::from("pad.level")), Some(0.0));
    assert_eq!(engine.param_value(&ParamName::from("lead.level")), Some(6.0));
    assert_eq!(engine.morph_position(), 1.0);

    // Bank the scenes, lose the live slots, and get them back.
    let bank = BankName::from("set-one");
    assert!(engine.save_to_bank(&bank, Slot::A));
    assert!(engine.save_to_bank(&bank, Slot::B));
    let exported = engine.export_bank(&bank).unwrap();

    let (mut second, _clock) = engine_with_clock();
    second.register_param(ParamName::from("pad.level"), ParamConfig::new(0.0, 10.0, 0.0));
    second.register_param(ParamName::from("lead.level"), ParamConfig::new(0.0, 10.0, 0.0));
    assert_eq!(second.import_bank(&exported).unwrap(), bank);
    assert!(second.load_from_bank(&bank, Slot::A));
    assert!(second.load_from_bank(&bank, Slot::B));

    second.set_morph_position(0.0, Millis::zero());
    assert_eq!(
        second.param_value(&ParamName::from("pad.level")),
        Some(8.0),
        "a restored scene A should reproduce the original capture"
    );
}

// Disposing a module mid-morph must stop its automation cold.
#[test]
fn demo_module_lifecycle_cleans_up_automation() {
    let (mut engine, clock) = engine_with_clock();
    register_test_modules(&mut engine);
    let events = engine.subscribe();

    let mut options = FxHashMap::default();
    options.insert("cutoff".to_string(), 0.2);
    let uid = engine
        .create_module(&ModuleKey::from("ladder-filter"), &options)
        .unwrap();
    let cutoff = ParamName(format!("{uid}.cutoff"));
    assert_eq!(
        engine.param_value(&cutoff),
        Some(0.2),
        "creation options should flow into the live store"
    );

    engine.morph_param(&cutoff, 1.0, Millis(1000.0), Easing::Linear);
    assert!(engine.remove_module(&uid));
    assert!(!engine.has_param(&cutoff));

    clock.set(Millis(2000.0));
    engine.advance();
    assert!(!engine.needs_tick());

    let removed = events
        .try_iter()
        .any(|ev| matches!(ev, EngineEvent::ModuleRemoved { uid: u } if u == uid));
    assert!(removed, "removal should be announced");
}

// Records a performance gesture and replays it with the same timing.
#[test]
fn demo_record_and_playback() {
    let (mut engine, clock) = engine_with_clock();
    engine.register_param(ParamName::from("wah"), ParamConfig::normalized(0.0));

    engine.start_recording();
    clock.set(Millis(100.0));
    engine.set_param_value(&ParamName::from("wah"), 1.0);
    clock.set(Millis(300.0));
    engine.set_param_value(&ParamName::from("wah"), 0.25);
    clock.set(Millis(400.0));
    let clip = engine.stop_recording().unwrap();
    assert_eq!(clip.changes.len(), 2);
    assert_eq!(clip.length, Millis(400.0));

    // Rewind the world and replay.
    engine.set_param_value(&ParamName::from("wah"), 0.0);
    engine.play_clip(clip);

    clock.set(Millis(550.0));
    engine.advance();
    assert_eq!(
        engine.param_value(&ParamName::from("wah")),
        Some(1.0),
        "the first recorded change replays at its original offset"
    );

    clock.set(Millis(900.0));
    engine.advance();
    assert_eq!(engine.param_value(&ParamName::from("wah")), Some(0.25));
    assert!(!engine.needs_tick(), "playback finished");
}

// A premium definition is invisible to instantiation until the entitlement
// predicate allows it.
#[test]
fn demo_tier_gating() {
    let (mut engine, _clock) = engine_with_clock();
    engine.set_entitlement(Box::new(|tier| tier == Tier::Free));
    engine.register_module(
        ModuleDescriptorBuilder::default()
            .key("granular-cloud")
            .category(Category::Effect)
            .tier(Tier::Premium)
            .build()
            .unwrap(),
        || Box::new(TestFilter),
    );

    let denied = engine.create_module(&ModuleKey::from("granular-cloud"), &Default::default());
    assert!(matches!(denied, Err(RegistryError::TierDenied { .. })));

    engine.set_entitlement(Box::new(|_| true));
    assert!(engine
        .create_module(&ModuleKey::from("granular-cloud"), &Default::default())
        .is_ok());
}

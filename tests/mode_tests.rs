use stereogram_engine::mode::{BlendFactors, UnknownDisplayMode};
use stereogram_engine::{DisplayMode, ModeController, ReconstructionParameters};

#[test]
fn defaults_match_a_comfortable_viewing_setup() {
    let params = ReconstructionParameters::default();
    assert_eq!(params.repeat_size, 100.0);
    assert_eq!(params.max_step_fraction, 0.3);
    assert_eq!(params.display_mode, DisplayMode::Stereo);
    assert!((params.max_step() - 30.0).abs() < 1e-5);
}

#[test]
fn blend_factors_per_mode() {
    let cases = [
        (DisplayMode::Stereo, 0.0, 0.0),
        (DisplayMode::Depth, 0.0, 1.0),
        (DisplayMode::Original, 1.0, 1.0),
    ];
    for (mode, show_original, show_depth) in cases {
        assert_eq!(
            mode.blend_factors(),
            BlendFactors {
                show_original,
                show_depth
            }
        );
    }
}

#[test]
fn setters_only_affect_later_snapshots() {
    let mut controller = ModeController::default();
    let before = controller.snapshot();

    controller.set_repeat_size(140.0);
    controller.set_max_step_fraction(0.45);
    controller.show_depth();

    assert_eq!(before, ReconstructionParameters::default());
    let after = controller.snapshot();
    assert_eq!(after.repeat_size, 140.0);
    assert_eq!(after.max_step_fraction, 0.45);
    assert_eq!(after.display_mode, DisplayMode::Depth);
}

#[test]
fn every_mode_reachable_from_every_mode() {
    let mut controller = ModeController::default();
    for from in DisplayMode::ALL {
        for to in DisplayMode::ALL {
            controller.set_display_mode(from);
            match to {
                DisplayMode::Depth => controller.show_depth(),
                DisplayMode::Stereo => controller.show_stereo(),
                DisplayMode::Original => controller.show_original(),
            }
            assert_eq!(controller.display_mode(), to, "{from} -> {to}");
        }
    }
}

#[test]
fn values_are_taken_as_given() {
    let mut controller = ModeController::default();
    controller.set_repeat_size(-5.0);
    controller.set_max_step_fraction(3.0);
    assert_eq!(controller.repeat_size(), -5.0);
    assert_eq!(controller.max_step_fraction(), 3.0);
}

#[test]
fn modes_parse_and_print_by_name() {
    for mode in DisplayMode::ALL {
        assert_eq!(mode.to_string().parse::<DisplayMode>(), Ok(mode));
    }
    assert_eq!(
        "anaglyph".parse::<DisplayMode>(),
        Err(UnknownDisplayMode("anaglyph".to_string()))
    );
}

#[test]
fn parameters_deserialize_with_defaults() {
    let params: ReconstructionParameters =
        serde_json::from_str(r#"{ "display_mode": "original" }"#).unwrap();
    assert_eq!(params.display_mode, DisplayMode::Original);
    assert_eq!(params.repeat_size, 100.0);
}

//! Integration tests for the session lifecycle
//!
//! Drives `LightSession` against the simulated light through claim,
//! switching and release, including discovery and validation failures.

use rgb_light::capabilities::{DeviceColor, HardwareIdentifier, LightColor};
use rgb_light::error::{LightError, LightResult};
use rgb_light::mock::{DeviceCommand, MockConnector, MockLight};
use rgb_light::port_locator::{DeviceIndex, FixedPort, IndexEntry, IndexPortLocator, MemoryIndex};
use rgb_light::session::{LightRequest, LightSession, SessionConfig, SessionState};
use std::sync::Arc;
use std::time::Duration;

const CLAIM_TIMEOUT: Duration = Duration::from_millis(1000);

fn session_for(light: &MockLight) -> LightSession {
    LightSession::new(
        SessionConfig::default(),
        Arc::new(FixedPort("/dev/ttyACM0".to_string())),
        Arc::new(MockConnector::new(light.clone())),
    )
}

async fn claimed_session(light: &MockLight) -> LightSession {
    let mut session = session_for(light);
    session.claim(CLAIM_TIMEOUT).await.unwrap();
    session
}

// =============================================================================
// Claim / Release
// =============================================================================

#[tokio::test]
async fn test_claim_through_device_index() {
    let light = MockLight::new();
    let index = MemoryIndex::new(vec![
        IndexEntry::new("VID_0403&PID_6001").with_port("A50285BI", "COM3"),
        IndexEntry::new("VID_03EB&PID_2404").with_port("6&2c5b3f1&0&1", "COM7"),
    ]);
    let connector = MockConnector::new(light.clone());
    let mut session = LightSession::new(
        SessionConfig::default(),
        Arc::new(IndexPortLocator::new(index)),
        Arc::new(connector.clone()),
    );

    assert_eq!(session.state(), SessionState::Unclaimed);
    session.claim(CLAIM_TIMEOUT).await.unwrap();

    assert_eq!(session.state(), SessionState::Claimed);
    assert_eq!(session.port_name(), Some("COM7"));
    assert_eq!(connector.opened_ports(), vec!["COM7".to_string()]);
}

#[tokio::test]
async fn test_claim_without_matching_port() {
    let light = MockLight::new();
    let index = MemoryIndex::new(vec![
        IndexEntry::new("VID_0403&PID_6001").with_port("A50285BI", "COM3")
    ]);
    let mut session = LightSession::new(
        SessionConfig::default(),
        Arc::new(IndexPortLocator::new(index)),
        Arc::new(MockConnector::new(light.clone())),
    );

    let err = session.claim(CLAIM_TIMEOUT).await.unwrap_err();
    assert!(matches!(err, LightError::DeviceNotFound(_)));
    assert_eq!(session.state(), SessionState::Unclaimed);
}

/// Index whose platform enumeration always fails.
struct BrokenIndex;

impl DeviceIndex for BrokenIndex {
    fn entries(&self) -> LightResult<Vec<IndexEntry>> {
        Err(LightError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "enumeration failed",
        )))
    }
}

#[tokio::test]
async fn test_claim_with_failing_index_reports_not_found() {
    let light = MockLight::new();
    let connector = MockConnector::new(light.clone());
    let mut session = LightSession::new(
        SessionConfig::default(),
        Arc::new(IndexPortLocator::new(BrokenIndex)),
        Arc::new(connector.clone()),
    );

    let err = session.claim(CLAIM_TIMEOUT).await.unwrap_err();
    match err {
        LightError::DeviceNotFound(message) => {
            assert!(message.contains("enumeration failed"), "{}", message)
        }
        other => panic!("expected DeviceNotFound, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Unclaimed);
    assert!(connector.opened_ports().is_empty());
}

#[tokio::test]
async fn test_claim_uses_configured_identifier() {
    let light = MockLight::new();
    let index = MemoryIndex::new(vec![
        IndexEntry::new("VID_03EB&PID_2404").with_port("a", "COM7"),
        IndexEntry::new("VID_1209&PID_0001").with_port("b", "COM9"),
    ]);
    let config = SessionConfig {
        hardware_id: HardwareIdentifier::new(0x1209, 0x0001, 0x0100),
        ..Default::default()
    };
    let mut session = LightSession::new(
        config,
        Arc::new(IndexPortLocator::new(index)),
        Arc::new(MockConnector::new(light)),
    );

    session.claim(CLAIM_TIMEOUT).await.unwrap();
    assert_eq!(session.port_name(), Some("COM9"));
}

#[tokio::test]
async fn test_claim_open_failure() {
    let light = MockLight::new();
    let mut session = LightSession::new(
        SessionConfig::default(),
        Arc::new(FixedPort("COM7".to_string())),
        Arc::new(MockConnector::new(light).fail_open()),
    );

    let err = session.claim(CLAIM_TIMEOUT).await.unwrap_err();
    assert!(matches!(err, LightError::DeviceUnavailable(_)));
    assert_eq!(session.state(), SessionState::Unclaimed);
}

#[tokio::test(start_paused = true)]
async fn test_claim_times_out() {
    let light = MockLight::new();
    let connector = MockConnector::new(light).with_open_delay(Duration::from_secs(5));
    let mut session = LightSession::new(
        SessionConfig::default(),
        Arc::new(FixedPort("COM7".to_string())),
        Arc::new(connector.clone()),
    );

    let err = session
        .claim(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, LightError::DeviceUnavailable(_)));
    assert!(connector.opened_ports().is_empty());
}

#[tokio::test]
async fn test_release_then_commands_fail() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    session.release().await;
    assert_eq!(session.state(), SessionState::Unclaimed);
    assert_eq!(session.port_name(), None);
    assert!(light.is_closed());

    let err = session
        .switch_on(LightRequest::new(1, LightColor::Primary))
        .await
        .unwrap_err();
    assert!(matches!(err, LightError::DeviceUnavailable(_)));

    let err = session.switch_off(1).await.unwrap_err();
    assert!(matches!(err, LightError::DeviceUnavailable(_)));

    // Nothing but the close reached the device
    assert_eq!(light.commands(), vec![DeviceCommand::Close]);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    session.release().await;
    session.release().await;

    assert_eq!(light.commands(), vec![DeviceCommand::Close]);

    // Never-claimed sessions release cleanly too
    let mut fresh = session_for(&MockLight::new());
    fresh.release().await;
    assert_eq!(fresh.state(), SessionState::Unclaimed);
}

#[tokio::test]
async fn test_reclaim_after_release() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;
    session.release().await;

    session.claim(CLAIM_TIMEOUT).await.unwrap();
    session
        .switch_on(LightRequest::new(1, LightColor::Custom2))
        .await
        .unwrap();
    assert_eq!(light.color(), DeviceColor::Yellow);
}

// =============================================================================
// Switching
// =============================================================================

#[tokio::test]
async fn test_steady_primary_is_green() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    session
        .switch_on(LightRequest::new(1, LightColor::Primary))
        .await
        .unwrap();

    assert_eq!(
        light.commands(),
        vec![DeviceCommand::SetColor(DeviceColor::Green)]
    );
    assert!(!session.is_blinking());
    assert_eq!(session.live_blink_tasks(), 0);
}

#[tokio::test]
async fn test_every_color_maps_to_fixed_device_color() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    let expected = [
        (LightColor::Primary, DeviceColor::Green),
        (LightColor::Custom1, DeviceColor::Red),
        (LightColor::Custom2, DeviceColor::Yellow),
        (LightColor::Custom3, DeviceColor::Orange),
        (LightColor::Custom4, DeviceColor::Blue),
        (LightColor::Custom5, DeviceColor::Magenta),
    ];

    // Twice, so the mapping is stable across repeated calls
    for _ in 0..2 {
        for (color, device_color) in expected {
            session
                .switch_on(LightRequest::new(1, color))
                .await
                .unwrap();
            assert_eq!(light.color(), device_color, "{:?}", color);
        }
    }
}

#[tokio::test]
async fn test_single_zero_duration_is_steady() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    session
        .switch_on(LightRequest::new(1, LightColor::Custom1).blink(500, 0))
        .await
        .unwrap();
    session
        .switch_on(LightRequest::new(1, LightColor::Custom3).blink(0, 500))
        .await
        .unwrap();

    assert_eq!(
        light.commands(),
        vec![
            DeviceCommand::SetColor(DeviceColor::Red),
            DeviceCommand::SetColor(DeviceColor::Orange),
        ]
    );
    assert!(!session.is_blinking());
}

#[tokio::test]
async fn test_invalid_light_numbers_do_no_io() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    for light_number in [i32::MIN, -1, 0, 2, 7, i32::MAX] {
        let err = session
            .switch_on(LightRequest::new(light_number, LightColor::Primary))
            .await
            .unwrap_err();
        assert!(matches!(err, LightError::InvalidLightSelection(n) if n == light_number));

        let err = session.switch_off(light_number).await.unwrap_err();
        assert!(matches!(err, LightError::InvalidLightSelection(_)));
    }

    assert_eq!(light.command_count(), 0);
}

#[tokio::test]
async fn test_negative_durations_do_no_io() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    for (on, off) in [(-10, 0), (0, -1), (-5, -5), (500, -500)] {
        let err = session
            .switch_on(LightRequest::new(1, LightColor::Primary).blink(on, off))
            .await
            .unwrap_err();
        assert!(matches!(err, LightError::InvalidArgument(_)));
    }

    assert_eq!(light.command_count(), 0);
}

#[tokio::test]
async fn test_undefined_enum_values_rejected() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    // Combined flags are not a single color
    let err = session
        .switch_on(LightRequest::raw(1, 0, 0, 0b11, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LightError::InvalidEnumValue { kind: "color", value: 3 }
    ));

    let err = session
        .switch_on(LightRequest::raw(1, 0, 0, 1, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, LightError::InvalidEnumValue { kind: "alarm", .. }));

    assert_eq!(light.command_count(), 0);
}

#[tokio::test]
async fn test_validation_runs_before_claim_check() {
    let light = MockLight::new();
    let mut session = session_for(&light);

    let err = session
        .switch_on(LightRequest::new(2, LightColor::Primary))
        .await
        .unwrap_err();
    assert!(matches!(err, LightError::InvalidLightSelection(2)));

    let err = session
        .switch_on(LightRequest::new(1, LightColor::Primary))
        .await
        .unwrap_err();
    assert!(matches!(err, LightError::DeviceUnavailable(_)));
}

#[tokio::test]
async fn test_switch_off_sets_off() {
    let light = MockLight::new();
    let mut session = claimed_session(&light).await;

    session
        .switch_on(LightRequest::new(1, LightColor::Custom5))
        .await
        .unwrap();
    session.switch_off(1).await.unwrap();

    assert_eq!(light.color(), DeviceColor::Off);
    assert_eq!(
        light.commands(),
        vec![
            DeviceCommand::SetColor(DeviceColor::Magenta),
            DeviceCommand::SetColor(DeviceColor::Off),
        ]
    );
}

#[tokio::test]
async fn test_direct_io_always_unsupported() {
    let light = MockLight::new();
    let unclaimed = session_for(&light);
    assert!(matches!(
        unclaimed.direct_io(0, 0, &[]),
        Err(LightError::UnsupportedOperation(_))
    ));

    let claimed = claimed_session(&light).await;
    assert!(matches!(
        claimed.direct_io(42, 7, b"payload"),
        Err(LightError::UnsupportedOperation(_))
    ));
    assert_eq!(light.command_count(), 0);
}

#[tokio::test]
async fn test_capabilities_declared() {
    let session = session_for(&MockLight::new());
    let caps = session.capabilities();

    assert_eq!(caps.max_lights, 1);
    assert_eq!(caps.colors, &LightColor::ALL);
    assert!(caps.blink);
    assert_eq!(caps.color_mask(), 0b11_1111);
}

use eagleeye_core::{Agent, AgentStatus, AgentValidationError, NewAgent};

fn sample() -> NewAgent {
    NewAgent::new("FALCON", "Jane Doe", "Berlin", "Active")
}

#[test]
fn new_agent_defaults_missions_to_zero() {
    assert_eq!(sample().missions_completed, 0);
    assert!(sample().validate().is_ok());
}

#[test]
fn validation_enforces_column_limits_in_chars() {
    let mut agent = sample();
    agent.code_name = "ü".repeat(50);
    assert!(agent.validate().is_ok(), "multi-byte chars count once");

    agent.code_name = "ü".repeat(51);
    assert_eq!(
        agent.validate(),
        Err(AgentValidationError::TooLong {
            field: "code_name",
            max: 50,
            actual: 51
        })
    );

    let mut agent = sample();
    agent.real_name = "r".repeat(101);
    assert!(matches!(
        agent.validate(),
        Err(AgentValidationError::TooLong {
            field: "real_name",
            ..
        })
    ));
}

#[test]
fn empty_strings_are_allowed_except_for_code_name() {
    let agent = NewAgent::new("SHADE", "", "", "");
    assert!(agent.validate().is_ok());

    let agent = NewAgent::new("", "Name", "Place", "Active");
    assert_eq!(agent.validate(), Err(AgentValidationError::EmptyCodeName));
}

#[test]
fn status_parse_is_case_insensitive_and_advisory() {
    assert_eq!(AgentStatus::parse(" injured "), Some(AgentStatus::Injured));
    assert_eq!(AgentStatus::parse("RETIRED"), Some(AgentStatus::Retired));
    assert_eq!(AgentStatus::parse("On Leave"), None);

    let agent = Agent::from_new(7, NewAgent::new("X", "Y", "Z", "On Leave"));
    assert_eq!(agent.known_status(), None);
    assert!(agent.validate().is_ok());
}

#[test]
fn display_renders_one_line_summary() {
    let mut new_agent = sample();
    new_agent.missions_completed = 4;
    let agent = Agent::from_new(1, new_agent);

    assert_eq!(
        agent.to_string(),
        "Agent [FALCON] - Jane Doe | Location: Berlin | Status: Active | Missions: 4"
    );
    assert_eq!(AgentStatus::Missing.to_string(), "Missing");
}

#[test]
fn serde_shape_uses_field_names_and_defaults_missions() {
    let agent = Agent::from_new(3, sample());
    let json = serde_json::to_value(&agent).unwrap();
    assert_eq!(json["id"], 3);
    assert_eq!(json["code_name"], "FALCON");
    assert_eq!(json["missions_completed"], 0);

    let parsed: NewAgent = serde_json::from_str(
        r#"{"code_name":"KITE","real_name":"Lo","location":"Oslo","status":"Active"}"#,
    )
    .unwrap();
    assert_eq!(parsed.missions_completed, 0);
}

use super::*;

fn people_axes() -> SelectionMachine {
    SelectionMachine::builder()
        .axis(AxisSpec::new("year", ["current", "graduated", "interned"]))
        .axis(
            AxisSpec::new("course", ["phd", "mtech", "btech", "intern"])
                .depends_on("year")
                .rule("current", ["phd", "mtech", "btech"], "phd")
                .rule("graduated", ["phd", "mtech", "btech"], "phd")
                .rule("interned", ["intern"], "intern"),
        )
        .build()
        .expect("valid axes")
}

fn assert_all_allowed(machine: &SelectionMachine) {
    for (axis, value) in machine.snapshot().iter() {
        let allowed = machine.allowed_values(axis.as_str()).expect("axis");
        match value {
            Some(value) => assert!(
                allowed.iter().any(|a| a == value),
                "{axis}={value} outside {allowed:?}"
            ),
            None => assert!(allowed.is_empty(), "{axis} unset with {allowed:?}"),
        }
    }
}

#[test]
fn starts_at_declared_defaults() {
    let machine = people_axes();
    assert_eq!(machine.current_value("year"), Ok(Some("current")));
    assert_eq!(machine.current_value("course"), Ok(Some("phd")));
    assert_eq!(
        machine.allowed_values("course").expect("course"),
        ["phd", "mtech", "btech"]
    );
}

#[test]
fn interned_year_forces_intern_course() {
    let mut machine = people_axes();
    machine.select("course", "mtech").expect("mtech allowed");

    let snapshot = machine.select("year", "interned").expect("interned allowed");

    assert_eq!(snapshot.get("year"), Some("interned"));
    assert_eq!(snapshot.get("course"), Some("intern"));
    assert_eq!(machine.allowed_values("course").expect("course"), ["intern"]);
}

#[test]
fn still_valid_child_survives_parent_change_by_default() {
    let mut machine = people_axes();
    machine.select("course", "btech").expect("btech");

    machine.select("year", "graduated").expect("graduated");

    assert_eq!(machine.current_value("course"), Ok(Some("btech")));
}

#[test]
fn always_policy_resets_child_on_every_parent_change() {
    let mut machine = SelectionMachine::builder()
        .axis(AxisSpec::new("year", ["current", "graduated"]))
        .axis(
            AxisSpec::new("course", ["phd", "mtech"])
                .depends_on("year")
                .rule("graduated", ["phd", "mtech"], "phd")
                .reset(ResetPolicy::Always),
        )
        .build()
        .expect("valid axes");
    machine.select("course", "mtech").expect("mtech");

    machine.select("year", "graduated").expect("graduated");

    assert_eq!(machine.current_value("course"), Ok(Some("phd")));
}

#[test]
fn rejected_selection_leaves_state_unchanged() {
    let mut machine = people_axes();
    let before = machine.snapshot();

    let err = machine.select("course", "intern").unwrap_err();

    assert_eq!(
        err,
        SelectionError::InvalidSelection {
            axis: AxisName::from("course"),
            value: "intern".into(),
        }
    );
    assert_eq!(machine.snapshot(), before);
}

#[test]
fn unknown_axis_is_reported() {
    let mut machine = people_axes();
    assert_eq!(
        machine.select("semester", "odd").unwrap_err(),
        SelectionError::UnknownAxis {
            axis: AxisName::from("semester"),
        }
    );
    assert!(machine.allowed_values("semester").is_err());
}

#[test]
fn resets_cascade_through_three_levels() {
    let mut machine = SelectionMachine::builder()
        .axis(AxisSpec::new("program", ["research", "outreach"]))
        .axis(
            AxisSpec::new("year", ["current", "interned"])
                .depends_on("program")
                .rule("outreach", ["interned"], "interned"),
        )
        .axis(
            AxisSpec::new("course", ["phd", "intern"])
                .depends_on("year")
                .rule("current", ["phd"], "phd")
                .rule("interned", ["intern"], "intern"),
        )
        .build()
        .expect("valid axes");

    let snapshot = machine.select("program", "outreach").expect("outreach");

    assert_eq!(snapshot.get("year"), Some("interned"));
    assert_eq!(snapshot.get("course"), Some("intern"));
    assert_all_allowed(&machine);
}

#[test]
fn every_select_sequence_keeps_values_allowed() {
    let mut machine = people_axes();
    let script = [
        ("year", "interned"),
        ("course", "phd"),
        ("year", "current"),
        ("course", "btech"),
        ("year", "interned"),
        ("course", "intern"),
        ("year", "graduated"),
        ("course", "mtech"),
        ("year", "missing"),
    ];

    for (axis, value) in script {
        let _ = machine.select(axis, value);
        assert_all_allowed(&machine);
    }
    assert_eq!(machine.current_value("year"), Ok(Some("graduated")));
    assert_eq!(machine.current_value("course"), Ok(Some("mtech")));
}

#[test]
fn replacing_values_keeps_current_when_still_present() {
    let mut machine = SelectionMachine::builder()
        .axis(AxisSpec::new("area", Vec::<String>::new()))
        .build()
        .expect("valid axes");
    assert_eq!(machine.current_value("area"), Ok(None));

    machine
        .replace_values("area", ["Systems", "Vision"], Some("Systems"))
        .expect("area");
    assert_eq!(machine.current_value("area"), Ok(Some("Systems")));

    machine.select("area", "Vision").expect("vision");
    machine
        .replace_values("area", ["Theory", "Vision"], Some("Theory"))
        .expect("area");
    assert_eq!(machine.current_value("area"), Ok(Some("Vision")));

    machine
        .replace_values("area", ["Theory"], Some("Theory"))
        .expect("area");
    assert_eq!(machine.current_value("area"), Ok(Some("Theory")));

    machine
        .replace_values("area", Vec::<String>::new(), None)
        .expect("area");
    assert_eq!(machine.current_value("area"), Ok(None));
}

#[test]
fn builder_rejects_child_declared_before_parent() {
    let err = SelectionMachine::builder()
        .axis(AxisSpec::new("course", ["phd"]).depends_on("year"))
        .axis(AxisSpec::new("year", ["current"]))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        AxisConfigError::UnknownParent {
            axis: AxisName::from("course"),
            parent: AxisName::from("year"),
        }
    );
}

#[test]
fn builder_rejects_default_outside_parent_rule() {
    let err = SelectionMachine::builder()
        .axis(AxisSpec::new("year", ["interned", "current"]))
        .axis(
            AxisSpec::new("course", ["phd", "intern"])
                .depends_on("year")
                .rule("interned", ["intern"], "intern"),
        )
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        AxisConfigError::DefaultNotAllowed {
            axis: AxisName::from("course"),
            default: "phd".into(),
        }
    );
}

#[test]
fn builder_rejects_duplicates_and_bad_rule_defaults() {
    let duplicate = SelectionMachine::builder()
        .axis(AxisSpec::new("year", ["current"]))
        .axis(AxisSpec::new("year", ["graduated"]))
        .build()
        .unwrap_err();
    assert!(matches!(duplicate, AxisConfigError::DuplicateAxis { .. }));

    let bad_rule = SelectionMachine::builder()
        .axis(AxisSpec::new("year", ["current"]))
        .axis(
            AxisSpec::new("course", ["phd"])
                .depends_on("year")
                .rule("current", ["phd"], "mtech"),
        )
        .build()
        .unwrap_err();
    assert!(matches!(bad_rule, AxisConfigError::DefaultNotAllowed { .. }));
}

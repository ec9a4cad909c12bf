use super::*;
use crate::models::PluginReference;
use crate::resolver::CheckReport;

fn plugin_result(reference: &PluginReference) -> CheckResult {
    CheckResult {
        subject: Subject::plugin(reference),
        dependent: PluginReference::new("my-plugin", "local"),
        required_version: "^0.3.0".to_string(),
        installed: true,
        enabled: Some(true),
        installed_version: Some("0.3.1".to_string()),
        valid: true,
        help: String::new(),
        marketplace_known: true,
        optional: false,
        availability: Availability::NotChecked,
        issue: None,
        action: None,
    }
}

fn system_result(command: &str, installed: bool, valid: bool) -> CheckResult {
    CheckResult {
        subject: Subject::System {
            command: command.to_string(),
        },
        installed,
        enabled: None,
        installed_version: installed.then(|| "1.0.0".to_string()),
        valid,
        ..plugin_result(&PluginReference::unqualified("unused"))
    }
}

#[test]
fn test_satisfied_dependency_needs_nothing() {
    let result = plugin_result(&PluginReference::new("bug-fixes", "aaronbassett-marketplace"));
    assert_eq!(map_to_action(&result), ResolutionAction::None);
}

#[test]
fn test_update_when_satisfying_version_available() {
    let result = CheckResult {
        installed_version: Some("0.2.0".to_string()),
        valid: false,
        availability: Availability::Available {
            marketplace: "aaronbassett-marketplace".to_string(),
            version: Some("0.4.0".to_string()),
        },
        ..plugin_result(&PluginReference::new("bug-fixes", "aaronbassett-marketplace"))
    };
    assert_eq!(
        map_to_action(&result),
        ResolutionAction::Update {
            name: "bug-fixes".to_string(),
            marketplace: "aaronbassett-marketplace".to_string(),
        }
    );
}

#[test]
fn test_unknown_marketplace_outranks_everything() {
    let result = CheckResult {
        installed: false,
        enabled: None,
        installed_version: None,
        valid: false,
        marketplace_known: false,
        ..plugin_result(&PluginReference::new("other-plugin", "cool-marketplace"))
    };
    assert_eq!(
        map_to_action(&result),
        ResolutionAction::AddMarketplace {
            marketplace: "cool-marketplace".to_string(),
        }
    );

    // Installed from a marketplace that has since been removed, wrong version
    let result = CheckResult {
        valid: false,
        marketplace_known: false,
        availability: Availability::Available {
            marketplace: "cool-marketplace".to_string(),
            version: Some("9.0.0".to_string()),
        },
        ..plugin_result(&PluginReference::new("other-plugin", "cool-marketplace"))
    };
    assert!(matches!(map_to_action(&result), ResolutionAction::AddMarketplace { .. }));
}

#[test]
fn test_not_installed_paths() {
    let reference = PluginReference::new("a", "m");
    let missing = CheckResult {
        installed: false,
        enabled: None,
        installed_version: None,
        valid: false,
        ..plugin_result(&reference)
    };

    let available = CheckResult {
        availability: Availability::Available {
            marketplace: "m".to_string(),
            version: Some("1.0.0".to_string()),
        },
        ..missing.clone()
    };
    assert_eq!(
        map_to_action(&available),
        ResolutionAction::Install {
            name: "a".to_string(),
            marketplace: Some("m".to_string()),
        }
    );

    let unknown = CheckResult {
        availability: Availability::Unknown {
            reason: "offline".to_string(),
        },
        ..missing.clone()
    };
    assert_eq!(
        map_to_action(&unknown),
        ResolutionAction::CheckRemoteManually {
            name: "a".to_string(),
        }
    );

    let unlisted = CheckResult {
        availability: Availability::Unavailable,
        ..missing
    };
    assert_eq!(
        map_to_action(&unlisted),
        ResolutionAction::Install {
            name: "a".to_string(),
            marketplace: Some("m".to_string()),
        }
    );
}

#[test]
fn test_ambiguity_maps_to_disambiguate() {
    let reference = PluginReference::unqualified("lint");
    let installed_twice = CheckResult {
        enabled: None,
        installed_version: None,
        valid: false,
        issue: Some(Issue::AmbiguousReference {
            candidates: vec!["lint@m1".to_string(), "lint@m2".to_string()],
        }),
        ..plugin_result(&reference)
    };
    assert_eq!(
        map_to_action(&installed_twice),
        ResolutionAction::Disambiguate {
            name: "lint".to_string(),
            candidates: vec!["lint@m1".to_string(), "lint@m2".to_string()],
        }
    );

    let offered_twice = CheckResult {
        installed: false,
        enabled: None,
        installed_version: None,
        valid: false,
        availability: Availability::Ambiguous {
            marketplaces: vec!["m1".to_string(), "m2".to_string()],
        },
        ..plugin_result(&reference)
    };
    assert_eq!(
        map_to_action(&offered_twice),
        ResolutionAction::Disambiguate {
            name: "lint".to_string(),
            candidates: vec!["lint@m1".to_string(), "lint@m2".to_string()],
        }
    );
}

#[test]
fn test_disabled_plugin_is_enabled_even_when_valid() {
    let result = CheckResult {
        enabled: Some(false),
        ..plugin_result(&PluginReference::new("a", "m"))
    };
    assert_eq!(
        map_to_action(&result),
        ResolutionAction::Enable {
            name: "a".to_string(),
            marketplace: Some("m".to_string()),
        }
    );
}

#[test]
fn test_system_dependency_actions() {
    assert_eq!(
        map_to_action(&system_result("gh", false, false)),
        ResolutionAction::InstallSystemDependency {
            command: "gh".to_string(),
            help: None,
        }
    );

    let mut outdated = system_result("gh", true, false);
    outdated.help = "brew upgrade gh".to_string();
    assert_eq!(
        map_to_action(&outdated),
        ResolutionAction::UpdateSystemDependency {
            command: "gh".to_string(),
            help: Some("brew upgrade gh".to_string()),
        }
    );

    assert_eq!(map_to_action(&system_result("gh", true, true)), ResolutionAction::None);
}

#[test]
fn test_mapping_is_total_and_consistent() {
    let availabilities = [
        Availability::NotChecked,
        Availability::Available {
            marketplace: "m".to_string(),
            version: Some("2.0.0".to_string()),
        },
        Availability::Unavailable,
        Availability::Unknown {
            reason: "offline".to_string(),
        },
    ];

    for installed in [false, true] {
        for enabled in [None, Some(false), Some(true)] {
            for valid in [false, true] {
                for marketplace_known in [false, true] {
                    for availability in &availabilities {
                        let result = CheckResult {
                            installed,
                            enabled,
                            valid,
                            marketplace_known,
                            availability: availability.clone(),
                            ..plugin_result(&PluginReference::new("a", "m"))
                        };
                        let action = map_to_action(&result);

                        // Deterministic
                        assert_eq!(action, map_to_action(&result));

                        if result.is_satisfied() {
                            assert_eq!(action, ResolutionAction::None);
                        } else {
                            assert!(action.is_needed(), "{result:?} mapped to None");
                            if !marketplace_known {
                                assert!(
                                    matches!(action, ResolutionAction::AddMarketplace { .. }),
                                    "{result:?} mapped to {action:?}"
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_action_display() {
    let install = ResolutionAction::Install {
        name: "a".to_string(),
        marketplace: Some("m".to_string()),
    };
    assert_eq!(install.to_string(), "/plugin install a@m");
    assert_eq!(
        ResolutionAction::AddMarketplace {
            marketplace: "cool-marketplace".to_string()
        }
        .to_string(),
        "/plugin marketplace add cool-marketplace"
    );
    assert_eq!(
        ResolutionAction::Enable {
            name: "a".to_string(),
            marketplace: None
        }
        .to_string(),
        "Enable via /plugin TUI"
    );
}

#[test]
fn test_action_json_shape() {
    let value = serde_json::to_value(ResolutionAction::Update {
        name: "a".to_string(),
        marketplace: "m".to_string(),
    })
    .unwrap();
    assert_eq!(value, serde_json::json!({ "type": "update", "name": "a", "marketplace": "m" }));

    let value = serde_json::to_value(ResolutionAction::None).unwrap();
    assert_eq!(value, serde_json::json!({ "type": "none" }));
}

#[test]
fn test_format_steps_all_satisfied() {
    let mut report = CheckReport::default();
    report.dependencies.push(plugin_result(&PluginReference::new("a", "m")));
    assert_eq!(format_steps(&steps_for_report(&report)), "All dependencies satisfied.");
}

#[test]
fn test_format_steps_numbered_list() {
    let mut report = CheckReport::default();
    report.dependencies.push(CheckResult {
        installed: false,
        enabled: None,
        installed_version: None,
        valid: false,
        marketplace_known: false,
        help: "Marketplace cool-marketplace is not known".to_string(),
        ..plugin_result(&PluginReference::new("other-plugin", "cool-marketplace"))
    });
    report.optional_system_dependencies.push(CheckResult {
        required_version: ">=2.0.0".to_string(),
        optional: true,
        ..system_result("gh", true, false)
    });

    let steps = steps_for_report(&report);
    assert_eq!(steps.len(), 2);
    assert!(steps[0].kind.is_required());
    assert!(!steps[1].kind.is_required());

    let rendered = format_steps(&steps);
    let expected = "## Resolution Steps (2 issues)\n\
                    \n\
                    1. [Required] other-plugin (required by my-plugin@local)\n   \
                    /plugin marketplace add cool-marketplace\n   \
                    Marketplace cool-marketplace is not known\n\
                    \n\
                    2. [Optional System] gh (required by my-plugin@local)\n   \
                    Update gh to satisfy version >=2.0.0";
    assert_eq!(rendered, expected);
}

#[test]
fn test_format_steps_singular_header() {
    let mut report = CheckReport::default();
    report.system_dependencies.push(system_result("jq", false, false));
    let rendered = format_steps(&steps_for_report(&report));
    assert!(rendered.starts_with("## Resolution Steps (1 issue)\n"));
    assert!(rendered.contains("1. [Required System] jq (required by my-plugin@local)"));
    assert!(rendered.ends_with("   Install jq"));
}

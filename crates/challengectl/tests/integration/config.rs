use anyhow::Result;

use crate::common::{challengectl, input_under_test};

#[test]
fn discovers_config_next_to_input() -> Result<()> {
    insta::assert_snapshot!(
        challengectl()
            .no_config(false)
            .args(["read", "--id", "1"])
            .input(input_under_test("config-scenarios/custom-key/puzzles.yml"))
            .run()?,
        @r#"
    {
      "id": 1,
      "name": "Riddle"
    }
    "#
    );

    Ok(())
}

#[test]
fn explicit_config() -> Result<()> {
    insta::assert_snapshot!(
        challengectl()
            .config(input_under_test("config-scenarios/custom-key/.challengectl.yml"))
            .args(["read", "--id", "1"])
            .input(input_under_test("config-scenarios/custom-key/puzzles.yml"))
            .run()?,
        @r#"
    {
      "id": 1,
      "name": "Riddle"
    }
    "#
    );

    Ok(())
}

#[test]
fn no_config_uses_defaults() -> Result<()> {
    // Without the config, `puzzles:` isn't a collection.
    let output = challengectl()
        .args(["read", "--id", "1"])
        .input(input_under_test("config-scenarios/custom-key/puzzles.yml"))
        .expects_failure(true)
        .run()?;

    assert!(output.contains("couldn't read record 1 from @@INPUT@@"));

    Ok(())
}

#[test]
fn invalid_config() -> Result<()> {
    let output = challengectl()
        .no_config(false)
        .args(["read", "--id", "5"])
        .input(input_under_test("config-scenarios/invalid/record.yml"))
        .expects_failure(true)
        .run()?;

    assert!(output.contains("failed to load config"));
    assert!(output.contains("config-scenarios/invalid/challengectl.yaml"));
    assert!(output.contains("invalid option `block-indent`: must be between 1 and 9, got 12"));

    Ok(())
}

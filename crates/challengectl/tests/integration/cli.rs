use std::fs;

use anyhow::Result;

use crate::common::{OutputMode, challengectl, input_under_test, scratch_copy};

fn collection() -> String {
    fs::read_to_string(input_under_test("collection.yml")).unwrap()
}

#[test]
fn patch_edits_one_line() -> Result<()> {
    let patched = challengectl()
        .args(["patch"])
        .input(input_under_test("collection.yml"))
        .args(["--values", &input_under_test("values/rename.yml")])
        .run()?;

    assert_eq!(
        patched,
        collection().replace("name: Warmup # easy one", "name: Warmup II # easy one")
    );

    Ok(())
}

#[test]
fn patch_with_editor_keys() -> Result<()> {
    // No `id` in the values, a plain URL, and camelCase keys.
    let patched = challengectl()
        .args(["patch", "--id", "1", "--ui-keys"])
        .input(input_under_test("collection.yml"))
        .args(["--values", &input_under_test("values/rename-ui.json")])
        .run()?;

    assert_eq!(
        patched,
        collection().replace("name: Warmup # easy one", "name: Warmup II # easy one")
    );

    Ok(())
}

#[test]
fn patch_values_from_stdin() -> Result<()> {
    let values = fs::read_to_string(input_under_test("values/rename.yml"))?;

    let patched = challengectl()
        .args(["patch", "--values", "-"])
        .input(input_under_test("collection.yml"))
        .stdin(values)
        .run()?;

    assert!(patched.contains("    name: Warmup II # easy one\n"));

    Ok(())
}

#[test]
fn patch_rejects_mismatched_id() -> Result<()> {
    let output = challengectl()
        .args(["patch", "--id", "2"])
        .input(input_under_test("collection.yml"))
        .args(["--values", &input_under_test("values/rename.yml")])
        .expects_failure(true)
        .run()?;

    assert!(output.contains("fatal: no document was written"));
    assert!(output.contains("--id 2 doesn't match the values' id (1)"));

    Ok(())
}

#[test]
fn patch_appends_new_records_in_place() -> Result<()> {
    let scratch = scratch_copy("collection.yml", "append.yml");

    let output = challengectl()
        .args(["patch", "--in-place"])
        .input(&scratch)
        .args(["--values", &input_under_test("values/new.yml")])
        .run()?;
    assert_eq!(output, "");

    let patched = fs::read_to_string(&scratch)?;
    assert!(patched.starts_with(&collection()));
    assert!(patched.contains("  - id: 3\n"));

    insta::assert_snapshot!(
        challengectl()
            .args(["read", "--id", "3"])
            .input(&scratch)
            .run()?,
        @r#"
    {
      "id": 3,
      "name": "Third",
      "tags": [
        "misc"
      ],
      "create-time": "2026-01-02T03:04:05.678Z",
      "update-time": "2026-01-02T03:04:05.678Z"
    }
    "#
    );

    // The other records are untouched.
    insta::assert_snapshot!(
        challengectl()
            .args(["read", "--id", "2"])
            .input(&scratch)
            .run()?,
        @r#"
    {
      "id": 2,
      "name": "Second",
      "tags": [
        "crypto",
        "rsa"
      ]
    }
    "#
    );

    Ok(())
}

#[test]
fn patch_strict_refuses_unknown_records() -> Result<()> {
    let output = challengectl()
        .args(["patch", "--strict"])
        .input(input_under_test("collection.yml"))
        .args(["--values", &input_under_test("values/new.yml")])
        .expects_failure(true)
        .run()?;

    assert!(output.contains("couldn't patch record 3 in @@INPUT@@"));
    assert!(output.contains("no record with id 3 in document"));

    Ok(())
}

#[test]
fn patch_falls_back_to_generating() -> Result<()> {
    let stdout = challengectl()
        .args(["patch"])
        .input(input_under_test("bare.yml"))
        .args(["--values", &input_under_test("values/nameless.yml")])
        .run()?;

    assert!(stdout.contains("name: Nameless\n"));
    assert!(!stdout.contains("# a lone record"));
    assert!(!stdout.contains("id:"));

    let stderr = challengectl()
        .args(["patch"])
        .input(input_under_test("bare.yml"))
        .args(["--values", &input_under_test("values/nameless.yml")])
        .output(OutputMode::Stderr)
        .run()?;

    assert!(stderr.contains("regenerating document: record has no usable `id`"));

    Ok(())
}

#[test]
fn patch_in_place_refuses_fallbacks() -> Result<()> {
    let scratch = scratch_copy("bare.yml", "fallback.yml");

    let output = challengectl()
        .args(["patch", "--in-place"])
        .input(&scratch)
        .args(["--values", &input_under_test("values/nameless.yml")])
        .expects_failure(true)
        .run()?;

    assert!(output.contains("refusing to overwrite @@INPUT@@"));
    assert_eq!(
        fs::read_to_string(&scratch)?,
        fs::read_to_string(input_under_test("bare.yml"))?
    );

    Ok(())
}

#[test]
fn read_record_fields() -> Result<()> {
    insta::assert_snapshot!(
        challengectl()
            .args(["read", "--id", "1"])
            .input(input_under_test("collection.yml"))
            .run()?,
        @r#"
    {
      "id": 1,
      "name": "Warmup",
      "difficulty-level": 1,
      "description-markdown": "Find the flag.\n",
      "base64-url": "aHR0cHM6Ly9leGFtcGxlLmNvbS8x",
      "tags": [
        "web"
      ],
      "solutions": []
    }
    "#
    );

    insta::assert_snapshot!(
        challengectl()
            .args(["read", "--id", "1", "--ui-keys", "--decode-url"])
            .input(input_under_test("collection.yml"))
            .run()?,
        @r#"
    {
      "id": 1,
      "name": "Warmup",
      "difficultyLevel": 1,
      "descriptionMarkdown": "Find the flag.\n",
      "base64Url": "https://example.com/1",
      "tags": [
        "web"
      ],
      "solutions": []
    }
    "#
    );

    Ok(())
}

#[test]
fn read_unknown_record() -> Result<()> {
    let output = challengectl()
        .args(["read", "--id", "9"])
        .input(input_under_test("collection.yml"))
        .expects_failure(true)
        .run()?;

    assert!(output.contains("couldn't read record 9 from @@INPUT@@"));

    Ok(())
}

#[test]
fn generate_single_record() -> Result<()> {
    let generated = challengectl()
        .args(["generate", "--values", &input_under_test("values/generate-one.yml")])
        .run()?;

    let fields = generated
        .lines()
        .filter(|line| !line.contains("-time:"))
        .collect::<Vec<_>>()
        .join("\n");

    insta::assert_snapshot!(fields, @r"
    id: 4
    name: Fourth
    base64-url: aHR0cHM6Ly9leGFtcGxlLmNvbS80
    ");
    assert!(generated.contains("2026-01-02T03:04:05.678Z"));

    Ok(())
}

#[test]
fn generate_collection() -> Result<()> {
    let generated = challengectl()
        .args(["generate", "--values", &input_under_test("values/generate-many.yml")])
        .run()?;

    assert!(generated.starts_with("challenges:\n- id: 1\n  name: One\n"));
    assert!(generated.contains("- id: 2\n  name: Two\n"));

    Ok(())
}

#[test]
fn url_encoding() -> Result<()> {
    insta::assert_snapshot!(
        challengectl().args(["url", "encode", "https://example.com/1"]).run()?,
        @"aHR0cHM6Ly9leGFtcGxlLmNvbS8x"
    );

    // Already encoded.
    insta::assert_snapshot!(
        challengectl().args(["url", "encode", "aHR0cHM6Ly9leGFtcGxlLmNvbS8x"]).run()?,
        @"aHR0cHM6Ly9leGFtcGxlLmNvbS8x"
    );

    insta::assert_snapshot!(
        challengectl().args(["url", "decode", "aHR0cHM6Ly9leGFtcGxlLmNvbS8x"]).run()?,
        @"https://example.com/1"
    );

    Ok(())
}

#[test]
fn version() -> Result<()> {
    insta::assert_snapshot!(
        challengectl().args(["--version"]).run()?,
        @"challengectl @@VERSION@@"
    );

    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn loads_a_minimal_workflow() {
    let yaml = r#"
jobs:
  - name: a
    steps:
      - uses: echo
        with: { message: "hi" }
"#;
    let wf = load(yaml).unwrap();
    assert_eq!(wf.jobs.len(), 1);
}

#[test]
fn rejects_duplicate_job_names() {
    let yaml = r#"
jobs:
  - name: a
    steps: [{ uses: echo, with: {} }]
  - name: a
    steps: [{ uses: echo, with: {} }]
"#;
    let err = load(yaml).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::DuplicateJobName(_))
    ));
}

#[test]
fn rejects_unknown_needs_target() {
    let yaml = r#"
jobs:
  - name: a
    needs: [missing]
    steps: [{ uses: echo, with: {} }]
"#;
    let err = load(yaml).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::UnknownNeeds { .. })
    ));
}

#[test]
fn rejects_duplicate_step_names_within_a_job() {
    let yaml = r#"
jobs:
  - name: a
    steps:
      - name: login
        uses: http
        with: {}
      - name: login
        uses: http
        with: {}
"#;
    let err = load(yaml).unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::DuplicateStepName(_, _))
    ));
}

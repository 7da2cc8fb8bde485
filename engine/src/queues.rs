// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Well-known task queue names (§4.5).

pub const WORKFLOW_EXECUTION_QUEUE: &str = "workflow_execution_stigmer";
pub const AGENT_EXECUTION_QUEUE: &str = "agent_execution_stigmer";
pub const WORKFLOW_VALIDATION_QUEUE: &str = "workflow_validation_stigmer";

pub const INVOKE_WORKFLOW_EXECUTION: &str = "InvokeWorkflowExecution";
pub const INVOKE_AGENT_EXECUTION: &str = "InvokeAgentExecution";
pub const EXECUTE_SERVERLESS_WORKFLOW: &str = "ExecuteServerlessWorkflow";
pub const VALIDATE_WORKFLOW_STRUCTURE: &str = "ValidateWorkflowStructure";
pub const COMPLETE_EXTERNAL_ACTIVITY: &str = "complete-external-activity";

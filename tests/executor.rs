mod common;

use common::*;
use relaygraph::agents::create_react_agent;
use relaygraph::channels::Channel;
use relaygraph::control::{Command, Send};
use relaygraph::graphs::GraphBuilder;
use relaygraph::message::Role;
use relaygraph::runtimes::{GraphExecutor, RunnerError, RuntimeConfig, SessionInit};
use relaygraph::state::AgentState;
use relaygraph::tools::ToolRegistry;
use relaygraph::types::NodeKind;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn linear_graph_appends_in_order_and_bumps_versions() {
    let graph = GraphBuilder::new()
        .add_node("first", SimpleMessageNode::new("first ran"))
        .add_node("second", SimpleMessageNode::new("second ran"))
        .add_edge(NodeKind::Start, "first")
        .add_edge("first", "second")
        .add_edge("second", NodeKind::End)
        .compile()
        .unwrap();

    let mut executor = GraphExecutor::new(graph).await;
    executor
        .create_thread("t1".into(), state_with_user("go"))
        .await
        .unwrap();
    let final_state = executor.run_until_complete("t1").await.unwrap();

    let contents: Vec<_> = final_state
        .messages
        .snapshot()
        .iter()
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(contents, vec!["go", "first ran", "second ran"]);
    // version 1 at creation, one bump per superstep that touched messages
    assert_eq!(final_state.messages.version(), 3);
    // nothing wrote extras, so that channel never moved
    assert_eq!(final_state.extra.version(), 1);
}

#[tokio::test]
async fn extra_deltas_land_in_scratch_space() {
    let graph = GraphBuilder::new()
        .add_node("writer", ExtraWriterNode {
            key: "verdict",
            value: json!("relevant"),
        })
        .add_edge(NodeKind::Start, "writer")
        .add_edge("writer", NodeKind::End)
        .compile()
        .unwrap();

    let final_state = graph.invoke(state_with_user("grade this")).await.unwrap();
    assert_extra_has(&final_state, "verdict");
    assert_eq!(final_state.extra.version(), 2);
}

#[tokio::test]
async fn command_goto_overrides_static_edges() {
    // jumper's static edge points at a node that would fail the run;
    // its command must win.
    let graph = GraphBuilder::new()
        .add_node("jumper", CommandNode {
            command: Command::goto("landing"),
        })
        .add_node("trap", FailingNode)
        .add_node("landing", SimpleMessageNode::new("landed"))
        .add_edge(NodeKind::Start, "jumper")
        .add_edge("jumper", "trap")
        .add_edge("trap", NodeKind::End)
        .add_edge("landing", NodeKind::End)
        .compile()
        .unwrap();

    let final_state = graph.invoke(state_with_user("jump")).await.unwrap();
    assert_message_contains(&final_state, "landed");
}

#[tokio::test]
async fn command_update_is_applied_before_the_jump() {
    let update = relaygraph::node::StateDelta::new()
        .with_messages(vec![relaygraph::message::Message::assistant("jumping now")]);
    let graph = GraphBuilder::new()
        .add_node("jumper", CommandNode {
            command: Command::goto("echoer").with_update(update),
        })
        .add_node("echoer", EchoFirstUserNode)
        .add_edge(NodeKind::Start, "jumper")
        .add_edge("echoer", NodeKind::End)
        .compile()
        .unwrap();

    let final_state = graph.invoke(state_with_user("remember me")).await.unwrap();
    assert_message_contains(&final_state, "jumping now");
    assert_message_contains(&final_state, "echo: remember me");
}

#[tokio::test]
async fn goto_unknown_node_fails_the_run() {
    let graph = GraphBuilder::new()
        .add_node("jumper", CommandNode {
            command: Command::goto("ghost"),
        })
        .add_edge(NodeKind::Start, "jumper")
        .compile()
        .unwrap();

    let err = graph.invoke(state_with_user("jump")).await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::UnknownGotoTarget { ref target, .. }
            if *target == NodeKind::Custom("ghost".into())
    ));
}

#[tokio::test]
async fn parent_command_at_top_level_is_structural() {
    let graph = GraphBuilder::new()
        .add_node("escaper", CommandNode {
            command: Command::goto("anywhere").in_parent(),
        })
        .add_node("anywhere", NoopNode)
        .add_edge(NodeKind::Start, "escaper")
        .add_edge("anywhere", NodeKind::End)
        .compile()
        .unwrap();

    let err = graph.invoke(state_with_user("up")).await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::NoParentGraph { ref node }
            if *node == NodeKind::Custom("escaper".into())
    ));
}

#[tokio::test]
async fn recursion_limit_stops_a_cycle() {
    let graph = GraphBuilder::new()
        .add_node("spinner", NoopNode)
        .add_edge(NodeKind::Start, "spinner")
        .add_edge("spinner", "spinner")
        .with_runtime_config(RuntimeConfig::default().with_recursion_limit(3))
        .compile()
        .unwrap();

    let err = graph.invoke(state_with_user("spin")).await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::RecursionLimitExceeded { limit: 3 }
    ));
}

#[tokio::test]
async fn fan_out_workers_see_only_their_send_state() {
    let graph = GraphBuilder::new()
        .add_node("dispatcher", CommandNode {
            command: Command::fan_out(vec![
                Send::with_task("w1", "task one"),
                Send::with_task("w2", "task two"),
            ]),
        })
        .add_node("w1", EchoFirstUserNode)
        .add_node("w2", EchoFirstUserNode)
        .add_edge(NodeKind::Start, "dispatcher")
        .add_edge("dispatcher", NodeKind::End)
        .compile()
        .unwrap();

    let final_state = graph.invoke(state_with_user("delegate")).await.unwrap();
    let contents: Vec<_> = final_state
        .messages
        .snapshot()
        .iter()
        .map(|m| m.content.clone())
        .collect();
    // Workers never saw "delegate"; their deltas merge in send order.
    assert_eq!(contents, vec!["delegate", "echo: task one", "echo: task two"]);
}

#[tokio::test]
async fn fan_out_to_unknown_target_fails() {
    let graph = GraphBuilder::new()
        .add_node("dispatcher", CommandNode {
            command: Command::fan_out(vec![Send::with_task("missing", "task")]),
        })
        .add_edge(NodeKind::Start, "dispatcher")
        .add_edge("dispatcher", NodeKind::End)
        .compile()
        .unwrap();

    let err = graph.invoke(state_with_user("delegate")).await.unwrap_err();
    assert!(matches!(err, RunnerError::UnknownGotoTarget { .. }));
}

#[tokio::test]
async fn node_failure_is_fatal_and_names_the_node() {
    let graph = GraphBuilder::new()
        .add_node("broken", FailingNode)
        .add_edge(NodeKind::Start, "broken")
        .add_edge("broken", NodeKind::End)
        .compile()
        .unwrap();

    let err = graph.invoke(state_with_user("try")).await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Node { ref node, .. }
            if *node == NodeKind::Custom("broken".into())
    ));
}

#[tokio::test]
async fn running_an_unknown_thread_fails() {
    let graph = GraphBuilder::new()
        .add_node("noop", NoopNode)
        .add_edge(NodeKind::Start, "noop")
        .add_edge("noop", NodeKind::End)
        .compile()
        .unwrap();

    let mut executor = GraphExecutor::new(graph).await;
    let err = executor.run_until_complete("nope").await.unwrap_err();
    assert!(matches!(err, RunnerError::ThreadNotFound { .. }));
}

#[tokio::test]
async fn same_thread_remembers_across_runs() {
    let graph = create_react_agent(Arc::new(NameRecallModel), ToolRegistry::new(), None).unwrap();
    let mut executor = GraphExecutor::new(graph).await;

    let init = executor
        .create_thread("will".into(), state_with_user("Hi, I'm Will"))
        .await
        .unwrap();
    assert!(matches!(init, SessionInit::Fresh));
    executor.run_until_complete("will").await.unwrap();

    // Second turn on the same thread resumes from the checkpoint.
    let init = executor
        .create_thread("will".into(), state_with_user("What's my name?"))
        .await
        .unwrap();
    assert!(matches!(init, SessionInit::Resumed { .. }));
    let final_state = executor.run_until_complete("will").await.unwrap();
    assert_message_contains(&final_state, "Your name is Will");

    // The transcript carries both turns in order.
    let roles: Vec<Role> = final_state
        .messages
        .snapshot()
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn different_thread_starts_blank() {
    let graph = create_react_agent(Arc::new(NameRecallModel), ToolRegistry::new(), None).unwrap();
    let mut executor = GraphExecutor::new(graph).await;

    executor
        .create_thread("will".into(), state_with_user("Hi, I'm Will"))
        .await
        .unwrap();
    executor.run_until_complete("will").await.unwrap();

    executor
        .create_thread("sam".into(), state_with_user("What's my name?"))
        .await
        .unwrap();
    let final_state = executor.run_until_complete("sam").await.unwrap();
    assert_message_contains(&final_state, "I don't know your name.");
}

#[tokio::test]
async fn invoke_uses_the_configured_thread_id() {
    let graph = GraphBuilder::new()
        .add_node("noop", SimpleMessageNode::new("done"))
        .add_edge(NodeKind::Start, "noop")
        .add_edge("noop", NodeKind::End)
        .with_runtime_config(RuntimeConfig::default().with_thread_id("fixed-thread"))
        .compile()
        .unwrap();

    let final_state = graph
        .invoke(AgentState::new_with_user_message("hi"))
        .await
        .unwrap();
    assert_message_contains(&final_state, "done");
}

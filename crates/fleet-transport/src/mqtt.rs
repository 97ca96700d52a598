//! Motion fabric bridge: publishes plans and shelf commands to the AGV
//! controllers over MQTT, and feeds their state/arrival reports back into
//! the orchestrator as inbound events.

use std::time::{SystemTime, UNIX_EPOCH};

use fleet_core::{NodeId, RobotId};
use fleet_orchestrator::{InboundEvent, OrchestratorHandle, OutboundEvent};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use crate::messages::{lowcmd_for, plan_for, shelf_command_for, MqttRobotArrived, MqttRobotState};

const TOPIC_PLAN: &str = "/agv/plan";
const TOPIC_LOWCMD: &str = "/agv/lowcmd";
const TOPIC_SHELF_CMD: &str = "/agv/shelf_cmd";
const TOPIC_STATE: &str = "/agv/state";
const TOPIC_ARRIVED: &str = "/agv/arrived";
const DEFAULT_SPEED: f64 = 0.3;

pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self { host: "localhost".into(), port: 1883, client_id: "fleet-orchestrator".into() }
    }
}

/// Connects to the broker, subscribes to `/agv/state` and `/agv/arrived`,
/// and forwards every outbound orchestrator event that has a motion-fabric
/// counterpart (plans, shelf pickup/putdown). Runs until the orchestrator's
/// broadcast channel closes.
pub async fn run_mqtt_bridge(config: MqttConfig, orchestrator: OrchestratorHandle) -> anyhow::Result<()> {
    let mut options = MqttOptions::new(config.client_id, config.host.clone(), config.port);
    options.set_keep_alive(std::time::Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(options, 64);
    client.subscribe(TOPIC_STATE, QoS::AtMostOnce).await?;
    client.subscribe(TOPIC_ARRIVED, QoS::AtMostOnce).await?;

    let inbound_handle = orchestrator.clone();
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handle_incoming(&publish.topic, &publish.payload, &inbound_handle);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "mqtt event loop error");
                }
            }
        }
    });

    let mut updates = orchestrator.subscribe();
    while let Ok(event) = updates.recv().await {
        publish_outbound(&client, &event).await;
    }
    Ok(())
}

fn handle_incoming(topic: &str, payload: &[u8], orchestrator: &OrchestratorHandle) {
    let result = match topic {
        TOPIC_STATE => serde_json::from_slice::<MqttRobotState>(payload).map(|s| InboundEvent::StatusUpdate {
            robot: RobotId::from(s.rid),
            node: Some(NodeId::from(s.current_node)),
        }),
        TOPIC_ARRIVED => serde_json::from_slice::<MqttRobotArrived>(payload).map(|a| InboundEvent::Arrived {
            robot: RobotId::from(a.rid),
            node: NodeId::from(a.node),
        }),
        other => {
            tracing::warn!(topic = other, "unexpected mqtt topic");
            return;
        }
    };

    match result {
        Ok(event) => {
            if let Err(e) = orchestrator.send(event) {
                tracing::warn!(error = %e, "orchestrator channel closed, dropping mqtt message");
            }
        }
        Err(e) => tracing::warn!(error = %e, topic, "failed to parse mqtt payload"),
    }
}

async fn publish_outbound(client: &AsyncClient, event: &OutboundEvent) {
    let job_id = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default().to_string();

    if let Some(plan) = plan_for(event, &job_id, DEFAULT_SPEED) {
        if let Ok(payload) = serde_json::to_vec(&plan) {
            if let Err(e) = client.publish(TOPIC_PLAN, QoS::AtMostOnce, false, payload).await {
                tracing::warn!(error = %e, "failed to publish plan");
            }
        }
    }
    // The orchestrator re-emits a `MotionPlan` on every 1 Hz tick for as long
    // as a robot is moving (see `reissue_motion_targets`), so this naturally
    // publishes a fresh `/agv/lowcmd` setpoint each tick too.
    if let Some(cmd) = lowcmd_for(event, DEFAULT_SPEED) {
        if let Ok(payload) = serde_json::to_vec(&cmd) {
            if let Err(e) = client.publish(TOPIC_LOWCMD, QoS::AtMostOnce, false, payload).await {
                tracing::warn!(error = %e, "failed to publish low-level drive command");
            }
        }
    }
    if let Some(cmd) = shelf_command_for(event) {
        if let Ok(payload) = serde_json::to_vec(&cmd) {
            if let Err(e) = client.publish(TOPIC_SHELF_CMD, QoS::AtMostOnce, false, payload).await {
                tracing::warn!(error = %e, "failed to publish shelf command");
            }
        }
    }
}

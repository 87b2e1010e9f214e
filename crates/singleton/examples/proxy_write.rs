//! Mount a device on one node and write to it from another

use netmount_bus::{BusClient, MessageBus};
use netmount_common::{Datastore, NormalizedNode, RemoteDeviceId};
use netmount_datastore::InMemoryBackend;
use netmount_singleton::{MasterNode, ProxyConfig, ProxyDataBroker};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bus = Arc::new(MessageBus::new());
    let device = RemoteDeviceId::new("router-1");
    let backend = InMemoryBackend::new();
    let config = ProxyConfig::default();

    let master = MasterNode::start(
        bus.clone(),
        device.clone(),
        Arc::new(backend.clone()),
        config.clone(),
    )?;
    let broker = ProxyDataBroker::new(device, BusClient::new("node-2", bus), config);

    let tx = broker.new_write_only_transaction().await;
    tx.put(
        Datastore::Configuration,
        "/interfaces/eth0".parse()?,
        NormalizedNode::container([
            ("mtu", NormalizedNode::leaf(9000)),
            ("enabled", NormalizedNode::leaf(true)),
        ]),
    )?;
    tx.commit().await?;
    println!("Committed {}", tx.identifier());

    let reader = broker.new_read_only_transaction().await;
    let node = reader
        .read(Datastore::Configuration, "/interfaces/eth0".parse()?)
        .await?;
    println!("Read back: {:?}", node);
    reader.close();

    master.shutdown().await;
    Ok(())
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Builds the two `tonic::transport::Server` instances (§4.4): one serves the
//! in-process `tokio::io::duplex` pair (`spawn_loopback`), the other the
//! network `TcpListener` (`serve_network`). Both run the same generated
//! service impls over the same `ControllerRegistry`, so a call looks
//! identical from either side; `InternalControl` is registered on the
//! loopback server only, so it's simply absent from the network server's
//! service set rather than filtered by an interceptor.

use super::client::LoopbackClient;
use super::proto::internal_control_server::InternalControlServer;
use super::proto::resource_command_server::ResourceCommandServer;
use super::proto::resource_query_server::ResourceQueryServer;
use super::service::{InternalControlService, ResourceCommandService, ResourceQueryService};
use crate::application::controllers::ControllerRegistry;
use std::net::SocketAddr;
use tonic::transport::{Endpoint, Server, Uri};

const LOOPBACK_BUFFER_BYTES: usize = 1024 * 1024;

/// Spins up the in-process duplex loopback server and hands back a connected
/// `LoopbackClient`. Used at daemon startup before the network listener binds
/// so bespoke controllers can be constructed with a working client.
pub async fn spawn_loopback(registry: ControllerRegistry) -> Result<LoopbackClient, tonic::transport::Error> {
    let (client_io, server_io) = tokio::io::duplex(LOOPBACK_BUFFER_BYTES);

    let command = ResourceCommandServer::new(ResourceCommandService::new(registry.clone()));
    let query = ResourceQueryServer::new(ResourceQueryService::new(registry.clone()));
    let internal = InternalControlServer::new(InternalControlService::new(registry));

    tokio::spawn(async move {
        let incoming = tokio_stream::once(Ok::<_, std::io::Error>(server_io));
        if let Err(err) = Server::builder()
            .add_service(command)
            .add_service(query)
            .add_service(internal)
            .serve_with_incoming(incoming)
            .await
        {
            tracing::error!(error = %err, "loopback gRPC server exited");
        }
    });

    let mut client_io = Some(client_io);
    let channel = Endpoint::try_from("http://loopback")?
        .connect_with_connector(tower::service_fn(move |_: Uri| {
            let io = client_io.take();
            async move {
                io.map(hyper_util::rt::TokioIo::new)
                    .ok_or_else(|| std::io::Error::other("loopback duplex already taken"))
            }
        }))
        .await?;

    Ok(LoopbackClient::new(channel))
}

/// Starts the network listener (no `InternalControl`, per §6) on `addr`.
/// Runs until the process shuts down; the supervisor (C1) owns cancellation.
pub async fn serve_network(
    addr: SocketAddr,
    registry: ControllerRegistry,
) -> Result<(), tonic::transport::Error> {
    let command = ResourceCommandServer::new(ResourceCommandService::new(registry.clone()));
    let query = ResourceQueryServer::new(ResourceQueryService::new(registry));

    tracing::info!(%addr, "network gRPC listener starting");
    Server::builder()
        .add_service(command)
        .add_service(query)
        .serve(addr)
        .await
}

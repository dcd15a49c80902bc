use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ipclink_message::{InMessage, OutMessage, RemotePtr};
use ipclink_rpc::{
    call_by_channel, no_callbacks, Dispatcher, FunctionInvoker, RpcError, RpcServer,
};
use ipclink_socket::PointToPoint;
use tracing::{debug, info, warn};

use crate::cmd::{bind_server, ids, install_ctrlc_handler, ServeArgs};
use crate::exit::{rpc_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

/// Run the demo arithmetic RPC server until Ctrl-C.
pub fn run(args: ServeArgs, _format: OutputFormat) -> CliResult<i32> {
    let listener = bind_server(&args.address)?;
    let server = RpcServer::from_socket(listener);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let dispatcher = AddDispatcher {
        running: Arc::clone(&running),
    };
    let keep_going = || running.load(Ordering::SeqCst);
    server
        .run(&dispatcher, &keep_going)
        .map_err(|err| rpc_error("server failed", err))?;

    info!("rpc server stopped");
    Ok(SUCCESS)
}

/// `add` computes locally; `add_with_callbacks` receives an opaque token and
/// fetches both addends back from the client before adding.
struct AddDispatcher {
    running: Arc<AtomicBool>,
}

impl Dispatcher for AddDispatcher {
    fn invoke(
        &self,
        id: u32,
        input: &mut InMessage,
        output: &mut OutMessage,
        socket: &mut PointToPoint,
    ) -> Result<(), RpcError> {
        debug!(id, function = ids::name(id), "dispatching");
        let running = Arc::clone(&self.running);
        let keep_going = move || running.load(Ordering::SeqCst);

        match id {
            ids::ADD => {
                FunctionInvoker::<(i32, i32), i32>::new().invoke(input, output, |(a, b)| a + b)
            }
            ids::ADD_WITH_CALLBACKS => FunctionInvoker::<(RemotePtr,), i32>::new().try_invoke(
                input,
                output,
                |(token,)| {
                    let mut cb_input = InMessage::new();
                    let mut cb_output = OutMessage::new();
                    let a: i32 = call_by_channel(
                        socket,
                        &mut cb_input,
                        &mut cb_output,
                        ids::ARG1,
                        no_callbacks,
                        &keep_going,
                        (token,),
                    )?;
                    let b: i32 = call_by_channel(
                        socket,
                        &mut cb_input,
                        &mut cb_output,
                        ids::ARG2,
                        no_callbacks,
                        &keep_going,
                        (token,),
                    )?;
                    Ok(a + b)
                },
            ),
            other => Err(RpcError::UnknownCallback { id: other }),
        }
    }

    fn report_error(&self, error: &RpcError) {
        if self.running.load(Ordering::SeqCst) {
            warn!(error = %error, "call failed");
        }
    }

    fn ready(&self) {
        info!("rpc server ready");
    }
}

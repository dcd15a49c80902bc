use std::collections::HashMap;

use ipclink_message::{InMessage, OutMessage, RemotePtr};
use ipclink_rpc::{call_by_link, no_callbacks, FunctionInvoker, RpcError};
use tracing::debug;

use crate::cmd::{ids, parse_endpoint, RpcAddArgs};
use crate::exit::{rpc_error, CliResult, SUCCESS};
use crate::output::{print_result, OutputFormat};

/// Call `add(a, b)` on a running server, either directly or through the
/// callback-based variant.
pub fn run(args: RpcAddArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.address)?;
    let keep_going = || true;

    let result: i32 = if args.with_callbacks {
        // The addends never go over the wire; the server only sees a token
        // it hands back through the arg1/arg2 callbacks.
        let mut pairs = HashMap::new();
        pairs.insert(1u64, (args.a, args.b));
        let token = RemotePtr::new(1);

        let dispatch = |id: u32,
                        input: &mut InMessage,
                        output: &mut OutMessage|
         -> Result<bool, RpcError> {
            debug!(id, callback = ids::name(id), "serving callback");
            match id {
                ids::ARG1 => {
                    FunctionInvoker::<(RemotePtr,), i32>::new()
                        .invoke(input, output, |(token,)| pairs[&token.raw()].0)?;
                    Ok(true)
                }
                ids::ARG2 => {
                    FunctionInvoker::<(RemotePtr,), i32>::new()
                        .invoke(input, output, |(token,)| pairs[&token.raw()].1)?;
                    Ok(true)
                }
                _ => Ok(false),
            }
        };

        call_by_link(
            &endpoint,
            ids::ADD_WITH_CALLBACKS,
            dispatch,
            &keep_going,
            (token,),
        )
        .map_err(|err| rpc_error("call failed", err))?
    } else {
        call_by_link(&endpoint, ids::ADD, no_callbacks, &keep_going, (args.a, args.b))
            .map_err(|err| rpc_error("call failed", err))?
    };

    print_result(result, format);
    Ok(SUCCESS)
}

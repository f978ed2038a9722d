// (C) Copyright IBM Corp. 2025.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;

/// Wrapper around a worker thread that is asked to terminate when the
/// handle goes out of scope.
///
/// The worker receives a termination receiver; dropping the handle drops
/// the paired sender, so a worker blocked on `recv`/`recv_timeout` observes
/// a disconnect and a polling worker sees `TryRecvError::Disconnected`.
#[derive(Debug)]
pub(crate) struct ThreadHandle<ResultType: Send + 'static> {
    _thread_termination_sender: std::sync::mpsc::Sender<()>,
    _thread_handle: Option<JoinHandle<ResultType>>,
}

impl<ResultType: Send + 'static> ThreadHandle<ResultType> {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: FnOnce(Receiver<()>) -> ResultType,
        F: Send + 'static,
    {
        let (thread_termination_sender, thread_termination_receiver) = std::sync::mpsc::channel();

        let t: JoinHandle<ResultType> = std::thread::spawn(move || f(thread_termination_receiver));

        Self {
            _thread_termination_sender: thread_termination_sender,
            _thread_handle: Some(t),
        }
    }
}

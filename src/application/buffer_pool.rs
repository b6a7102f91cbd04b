//! Listas libres para los buffers temporales de cada frame.
//!
//! Un elemento entregado por [`Pool::acquire`] pertenece en exclusiva al dueño del
//! guard [`Pooled`]. Solo vuelve a la lista libre cuando el guard se libera
//! (explícitamente o en `drop`), así que dos usuarios nunca ven el mismo elemento a la
//! vez. Cualquier vista prestada del guard, como un tensor sobre el buffer de floats,
//! mantiene vivo el guard hasta que desaparece.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct Pool<T> {
    idle: Mutex<Vec<T>>,
    max_idle: usize,
    allocated: AtomicUsize,
    make: Box<dyn Fn() -> T + Send + Sync>,
    reset: fn(&mut T),
}

impl<T> Pool<T> {
    pub fn new(
        max_idle: usize,
        make: impl Fn() -> T + Send + Sync + 'static,
        reset: fn(&mut T),
    ) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            allocated: AtomicUsize::new(0),
            make: Box::new(make),
            reset,
        }
    }

    /// Devuelve un elemento libre, o construye uno nuevo si la lista está vacía. Nunca
    /// espera a otros usuarios.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let reused = self.idle.lock().pop();
        let item = match reused {
            Some(mut item) => {
                (self.reset)(&mut item);
                item
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                (self.make)()
            }
        };
        Pooled { pool: self, item: Some(item) }
    }

    fn put_back(&self, item: T) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    /// Elementos construidos desde que se creó el pool.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

/// Acceso exclusivo a un elemento del pool.
pub struct Pooled<'a, T> {
    pool: &'a Pool<T>,
    item: Option<T>,
}

impl<T> Pooled<'_, T> {
    /// Devuelve el elemento al pool. Equivale a soltar el guard, pero deja visible el
    /// punto de liberación.
    pub fn release(self) {}
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Solo `drop` saca el elemento.
        self.item.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.put_back(item);
        }
    }
}

/// Los dos tipos de buffer reutilizados en el camino caliente.
pub struct BufferPools {
    /// Tensores de entrada planares `3 × side × side`.
    pub tensors: Pool<Box<[f32]>>,
    /// Buffers de serialización de respuestas; se vacían al reutilizarse, conservan capacidad.
    pub bytes: Pool<Vec<u8>>,
}

impl BufferPools {
    pub fn new(plane_side: usize, max_idle: usize) -> Self {
        let len = 3 * plane_side * plane_side;
        Self {
            tensors: Pool::new(max_idle, move || vec![0.0f32; len].into_boxed_slice(), |_| {}),
            bytes: Pool::new(max_idle, || Vec::with_capacity(4096), Vec::clear),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};

    #[test]
    fn reuses_released_items() {
        let pools = BufferPools::new(4, 8);
        let first = pools.tensors.acquire();
        assert_eq!(first.len(), 3 * 4 * 4);
        let ptr = first.as_ptr();
        first.release();
        assert_eq!(pools.tensors.idle(), 1);

        let second = pools.tensors.acquire();
        assert_eq!(second.as_ptr(), ptr);
        assert_eq!(pools.tensors.allocated(), 1);
        assert_eq!(pools.tensors.idle(), 0);
    }

    #[test]
    fn held_items_are_never_handed_out_twice() {
        let pools = BufferPools::new(2, 8);
        let a = pools.tensors.acquire();
        let b = pools.tensors.acquire();
        assert_ne!(a.as_ptr(), b.as_ptr());
        assert_eq!(pools.tensors.allocated(), 2);
    }

    #[test]
    fn byte_buffers_are_emptied_but_keep_capacity() {
        let pools = BufferPools::new(1, 8);
        let mut buf = pools.bytes.acquire();
        buf.extend_from_slice(&[7u8; 10_000]);
        let cap = buf.capacity();
        drop(buf);

        let buf = pools.bytes.acquire();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), cap);
    }

    #[test]
    fn idle_list_is_capped() {
        let pools = BufferPools::new(1, 1);
        let a = pools.bytes.acquire();
        let b = pools.bytes.acquire();
        a.release();
        b.release();
        assert_eq!(pools.bytes.idle(), 1);
    }

    #[test]
    fn concurrent_borrowers_get_distinct_buffers() {
        const THREADS: usize = 8;
        let pools = Arc::new(BufferPools::new(8, THREADS));
        let barrier = Arc::new(Barrier::new(THREADS));
        let seen = Arc::new(parking_lot::Mutex::new(HashSet::new()));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let pools = Arc::clone(&pools);
                let barrier = Arc::clone(&barrier);
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let mut buf = pools.tensors.acquire();
                        buf.fill(i as f32);
                        // Aquí todos tienen un buffer.
                        barrier.wait();
                        assert!(seen.lock().insert(buf.as_ptr() as usize));
                        assert!(buf.iter().all(|&v| v == i as f32));
                        barrier.wait();
                        seen.lock().remove(&(buf.as_ptr() as usize));
                        barrier.wait();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pools.tensors.allocated() <= THREADS);
    }
}
